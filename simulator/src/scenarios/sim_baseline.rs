// Runs the baseline simulation
//
// One experiment from config_baseline.toml: the default restaking network
// with the large-service slashing event partway through the horizon. Saves
// the full trajectories and a final-timestep summary.

use std::env;
use std::fs;

use chrono::Local;
use hubsim::utils::logging;

use crate::config::{Config, ConfigError};
use crate::save_results;
use crate::scenarios::sweep_runner::run_simulation;

pub fn run_baseline_simulation() -> Result<(), ConfigError> {
    fs::create_dir_all("simulator/results/sim_baseline")
        .expect("Failed to create results directory");
    setup_logging();

    let config = Config::load()?;
    log_configuration(&config);

    let output = run_simulation(&config)?;
    if !output.failures.is_empty() {
        logging::log(
            "SIMULATOR",
            &format!("{} runs aborted, see failures.json", output.failures.len()),
        );
    }
    save_results::save_experiment("sim_baseline", &output)?;

    logging::log("SIMULATOR", "=== Baseline Simulation Complete ===");
    Ok(())
}

/// Sets up logging if ENABLE_LOGS environment variable is set
fn setup_logging() {
    if env::var("ENABLE_LOGS").is_ok() {
        env::set_var("HUBSIM_LOGGING", "true");
        logging::init_logging();
    }
}

fn log_configuration(config: &Config) {
    let start_time = Local::now();
    logging::log("SIMULATOR", "=== Baseline Simulation Configuration ===");
    logging::log(
        "SIMULATOR",
        &format!("Start Time: {}", start_time.format("%Y-%m-%d %H:%M:%S")),
    );
    logging::log(
        "SIMULATOR",
        &format!("Timesteps: {}", config.simulation.timesteps),
    );
    logging::log(
        "SIMULATOR",
        &format!("Monte Carlo Runs: {}", config.simulation.monte_carlo_runs),
    );
    logging::log(
        "SIMULATOR",
        &format!("Validators: {}", config.network.num_validators),
    );
    logging::log(
        "SIMULATOR",
        &format!(
            "Chains: {} public + {} private",
            config.network.public_chains, config.network.private_chains
        ),
    );
    logging::log("SIMULATOR", &format!("Staking Mode: {}", config.staking.mode));
    logging::log(
        "SIMULATOR",
        &format!("Slashing Date: {}", config.slashing.date_slashing),
    );
    logging::log(
        "SIMULATOR",
        &format!("Slashing Fraction: {}", config.slashing.slashing_fraction),
    );
    logging::log("SIMULATOR", "=============================");
}
