// Runs the sweep slashing fraction simulation
//
// This sweep explores how the severity of the large-service slashing event
// affects validator yields and stake concentration. The fraction slashed
// from the target chain rises from 0.0 in steps of slashing_fraction_step,
// one full experiment per value.

use crate::config::{Config, ConfigError, SweepConfig};
use crate::scenarios::sweep_runner::SweepRunner;

pub fn run_sweep_slashing_fraction_simulation() -> Result<(), ConfigError> {
    let sweep_config = SweepConfig::load_sweep_slashing_fraction()?;
    let step = sweep_config
        .sweep
        .slashing_fraction_step
        .ok_or_else(|| ConfigError::ValidationError("slashing_fraction_step is required".into()))?;
    let fractions: Vec<f64> = (0..sweep_config.sweep.num_simulations)
        .map(|i| (i as f64 * step).min(1.0))
        .collect();

    let runner = SweepRunner::new(
        "Slashing Fraction",
        "sim_sweep_slashing_fraction",
        "slashing_fraction",
        fractions,
        Box::new(SweepConfig::load_sweep_slashing_fraction),
        Box::new(|sweep_config, slashing_fraction| {
            let mut config: Config = sweep_config.base();
            config.slashing.slashing_fraction = slashing_fraction; // value that is swept over
            config
        }),
    );
    runner.run()
}
