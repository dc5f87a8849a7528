pub mod sim_baseline;
pub mod sim_sweep_slashing_fraction;
pub mod sim_sweep_staking_mode;
pub mod sweep_runner;
