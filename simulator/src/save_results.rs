//! JSON result saving for simulation runs and sweeps.

use std::fs;

use hubsim::utils::logging;
use hubsim::ExperimentOutput;
use serde_json::json;

use crate::config::ConfigError;

/// Saves one experiment under `simulator/results/<results_dir>/data/`:
/// the full trajectory rows, any per-run failures, and a small summary.
pub fn save_experiment(results_dir: &str, output: &ExperimentOutput) -> Result<(), ConfigError> {
    let data_dir = format!("simulator/results/{}/data", results_dir);
    fs::create_dir_all(&data_dir)?;

    let trajectories_file = format!("{}/trajectories.json", data_dir);
    fs::write(
        &trajectories_file,
        serde_json::to_string_pretty(&output.rows)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?,
    )?;

    if !output.failures.is_empty() {
        let failures_file = format!("{}/failures.json", data_dir);
        fs::write(
            &failures_file,
            serde_json::to_string_pretty(&output.failures)
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?,
        )?;
    }

    let summary_file = format!("{}/summary.json", data_dir);
    fs::write(
        &summary_file,
        serde_json::to_string_pretty(&summarize(output))
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?,
    )?;

    logging::log(
        "SIMULATOR",
        &format!("Saved {} trajectory rows to {}", output.rows.len(), trajectories_file),
    );
    Ok(())
}

/// Final-timestep aggregates, averaged across runs.
pub fn summarize(output: &ExperimentOutput) -> serde_json::Value {
    let last_timestep = output.rows.iter().map(|r| r.timestep).max().unwrap_or(0);
    let finals: Vec<_> = output
        .rows
        .iter()
        .filter(|r| r.timestep == last_timestep)
        .collect();
    let mean = |f: &dyn Fn(&hubsim::TrajectoryRow) -> f64| -> f64 {
        if finals.is_empty() {
            0.0
        } else {
            finals.iter().map(|&r| f(r)).sum::<f64>() / finals.len() as f64
        }
    };

    json!({
        "num_rows": output.rows.len(),
        "num_failures": output.failures.len(),
        "final_timestep": last_timestep,
        "final_supply_mean": mean(&|r| r.state.supply),
        "final_staked_total_mean": mean(&|r| r.state.staked_total),
        "final_avg_gini_mean": mean(&|r| r.state.avg_gini),
        "final_avg_hhi_mean": mean(&|r| r.state.avg_hhi),
        "final_monopoly_51_mean": mean(&|r| r.state.monopoly_51),
        "final_monopoly_33_mean": mean(&|r| r.state.monopoly_33),
        "final_total_profit_yields_mean": mean(&|r| r.state.total_profit_yields),
        "final_slashable_stake_large_service_mean": mean(&|r| r.state.slashable_stake_large_service),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubsim::params::ParameterSweep;
    use hubsim::{run_experiment, RunPlan};

    #[test]
    fn test_summary_uses_final_timestep_only() {
        let sweep = ParameterSweep::default();
        let stake = vec![1_000_000.0; 20];
        let plan = RunPlan {
            timesteps: 3,
            monte_carlo_runs: 2,
            base_seed: 5,
        };
        let output = run_experiment(&sweep, &stake, &plan).unwrap();
        let summary = summarize(&output);
        assert_eq!(summary["final_timestep"], 3);
        assert_eq!(summary["num_failures"], 0);
        assert!(summary["final_supply_mean"].as_f64().unwrap() > 0.0);
    }
}
