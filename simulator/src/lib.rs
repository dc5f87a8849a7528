pub mod config;
pub mod save_results;
pub mod scenarios;
pub mod stake;

pub use config::{Config, ConfigError, SweepConfig};
pub use save_results::save_experiment;
pub use stake::generate_initial_stake;
