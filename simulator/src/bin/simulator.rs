use std::env;

use simulator::config::ConfigError;
use simulator::scenarios::{
    sim_baseline::run_baseline_simulation,
    sim_sweep_slashing_fraction::run_sweep_slashing_fraction_simulation,
    sim_sweep_staking_mode::run_sweep_staking_mode_simulation,
};

// ------------------------------------------------------------------------------------------------
// Main
// ------------------------------------------------------------------------------------------------

/// Entry point: picks the scenario from the first command line argument.
fn main() -> Result<(), ConfigError> {
    env_logger::init();

    let scenario = env::args().nth(1).unwrap_or_else(|| "baseline".to_string());
    match scenario.as_str() {
        "baseline" => run_baseline_simulation(),
        "sweep_slashing_fraction" => run_sweep_slashing_fraction_simulation(),
        "sweep_staking_mode" => run_sweep_staking_mode_simulation(),
        other => {
            eprintln!("Unknown scenario '{}'", other);
            eprintln!("Available scenarios:");
            eprintln!("  baseline                 (default)");
            eprintln!("  sweep_slashing_fraction");
            eprintln!("  sweep_staking_mode");
            Err(ConfigError::ValidationError(format!(
                "unknown scenario '{}'",
                other
            )))
        }
    }
}
