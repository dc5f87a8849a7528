use std::env;
use std::fs;

use hubsim::utils::logging;
use hubsim::{run_experiment, ExperimentOutput};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{Config, ConfigError, SweepConfig};
use crate::save_results;
use crate::stake::generate_initial_stake;

/// Generic sweep runner that eliminates duplication across sweep scenarios.
///
/// Each parameter value becomes one full experiment: the modifier rewrites
/// the base configuration, the experiment runs, and its results land under
/// `simulator/results/<results_dir>/data/sim_<index>`.
pub struct SweepRunner<T> {
    sweep_name: String,
    results_dir: String,
    parameter_name: String,
    parameter_values: Vec<T>,
    config_loader: Box<dyn Fn() -> Result<SweepConfig, ConfigError>>,
    config_modifier: Box<dyn Fn(&SweepConfig, T) -> Config>,
}

impl<T: std::fmt::Debug + Clone + serde::Serialize> SweepRunner<T> {
    pub fn new(
        sweep_name: &str,
        results_dir: &str,
        parameter_name: &str,
        parameter_values: Vec<T>,
        config_loader: Box<dyn Fn() -> Result<SweepConfig, ConfigError>>,
        config_modifier: Box<dyn Fn(&SweepConfig, T) -> Config>,
    ) -> Self {
        Self {
            sweep_name: sweep_name.to_string(),
            results_dir: results_dir.to_string(),
            parameter_name: parameter_name.to_string(),
            parameter_values,
            config_loader,
            config_modifier,
        }
    }

    /// Runs the complete sweep.
    pub fn run(&self) -> Result<(), ConfigError> {
        self.create_directories();
        self.setup_logging();

        let sweep_config = (self.config_loader)()?;
        self.log_sweep_start();

        println!("Running Sweep: {}", self.sweep_name);
        let progress_bar = self.create_progress_bar(self.parameter_values.len());

        let mut all_results = Vec::new();
        for (sim_index, param_value) in self.parameter_values.iter().enumerate() {
            logging::log(
                "SIMULATOR",
                &format!(
                    "Running simulation {}/{} with {}: {:?}",
                    sim_index + 1,
                    self.parameter_values.len(),
                    self.parameter_name,
                    param_value
                ),
            );

            let sim_config = (self.config_modifier)(&sweep_config, param_value.clone());
            let output = run_simulation(&sim_config).map_err(|e| {
                ConfigError::ValidationError(format!(
                    "Sweep '{}' failed during simulation {}/{} with {}: {:?}. Error: {}",
                    self.sweep_name,
                    sim_index + 1,
                    self.parameter_values.len(),
                    self.parameter_name,
                    param_value,
                    e
                ))
            })?;

            save_results::save_experiment(
                &format!("{}/sim_{}", self.results_dir, sim_index),
                &output,
            )?;
            all_results.push((param_value.clone(), output));

            progress_bar.inc(1);
            progress_bar.set_message(format!(
                "Simulation {}/{} with {}: {:?}",
                sim_index + 1,
                self.parameter_values.len(),
                self.parameter_name,
                param_value
            ));
        }
        progress_bar.finish_with_message("done");
        println!("Sweep simulation complete");

        self.save_combined_results(&all_results)?;

        logging::log("SIMULATOR", "=== Sweep Simulation Complete ===");
        logging::log(
            "SIMULATOR",
            &format!("Total simulations completed: {}", all_results.len()),
        );
        Ok(())
    }

    fn create_directories(&self) {
        fs::create_dir_all(format!("simulator/results/{}", self.results_dir))
            .expect("Failed to create results directory");
        fs::create_dir_all(format!("simulator/results/{}/data", self.results_dir))
            .expect("Failed to create data directory");
    }

    /// Sets up logging if ENABLE_LOGS environment variable is set
    fn setup_logging(&self) {
        if env::var("ENABLE_LOGS").is_ok() {
            env::set_var("HUBSIM_LOGGING", "true");
            logging::init_logging();
        }
    }

    fn create_progress_bar(&self, num_simulations: usize) -> ProgressBar {
        let progress_bar = ProgressBar::new(num_simulations as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {msg}")
                .unwrap()
                .progress_chars("+>-"),
        );
        progress_bar
    }

    fn log_sweep_start(&self) {
        logging::log(
            "SIMULATOR",
            &format!("=== Sweep {} Simulation ===", self.sweep_name),
        );
        logging::log(
            "SIMULATOR",
            &format!("Number of simulations: {}", self.parameter_values.len()),
        );
        logging::log(
            "SIMULATOR",
            &format!("{} values: {:?}", self.parameter_name, self.parameter_values),
        );
        logging::log("SIMULATOR", "================================");
    }

    fn save_combined_results(
        &self,
        all_results: &[(T, ExperimentOutput)],
    ) -> Result<(), ConfigError> {
        let combined = serde_json::json!({
            "sweep_name": self.sweep_name,
            "parameter_name": self.parameter_name,
            "parameter_values": all_results.iter().map(|(p, _)| p).collect::<Vec<_>>(),
            "summaries": all_results
                .iter()
                .map(|(_, output)| save_results::summarize(output))
                .collect::<Vec<_>>(),
        });
        let combined_file = format!(
            "simulator/results/{}/data/sweep_results.json",
            self.results_dir
        );
        fs::write(
            &combined_file,
            serde_json::to_string_pretty(&combined)
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?,
        )?;
        logging::log(
            "SIMULATOR",
            &format!("Saved combined sweep results to {}", combined_file),
        );
        Ok(())
    }
}

/// Runs one experiment from a fully resolved configuration.
pub fn run_simulation(config: &Config) -> Result<ExperimentOutput, ConfigError> {
    let sweep = config.to_parameter_sweep()?;
    let plan = config.run_plan();
    let initial_stake = generate_initial_stake(
        config.network.num_validators,
        config.total_initial_stake(),
        config.simulation.base_seed,
    );
    run_experiment(&sweep, &initial_stake, &plan)
        .map_err(|e| ConfigError::ValidationError(e.to_string()))
}
