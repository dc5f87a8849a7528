// Runs the sweep staking mode simulation
//
// Side-by-side comparison of restaking (MultiStaking) and liquidity
// fragmentation (SingleStaking) under otherwise identical parameters,
// one full experiment per mode. The interesting outputs are the slashing
// impact on validator totals and the centralization metrics.

use crate::config::{Config, ConfigError, SweepConfig};
use crate::scenarios::sweep_runner::SweepRunner;

pub fn run_sweep_staking_mode_simulation() -> Result<(), ConfigError> {
    let sweep_config = SweepConfig::load_sweep_staking_mode()?;
    let modes = sweep_config
        .sweep
        .staking_modes
        .clone()
        .ok_or_else(|| ConfigError::ValidationError("staking_modes list is required".into()))?;

    let runner = SweepRunner::new(
        "Staking Mode",
        "sim_sweep_staking_mode",
        "staking_mode",
        modes,
        Box::new(SweepConfig::load_sweep_staking_mode),
        Box::new(|sweep_config, mode: String| {
            let mut config: Config = sweep_config.base();
            config.staking.mode = mode; // value that is swept over
            config
        }),
    );
    runner.run()
}
