pub mod types;
pub mod constants;
pub mod error;
pub mod matrix;
pub mod params;
pub mod stochastic;
pub mod state;
pub mod parts;
pub mod engine;
pub mod utils;

pub use engine::runner::{run_experiment, ExperimentOutput, RunFailure, RunPlan};
pub use error::SimError;
pub use params::{ParameterSet, ParameterSweep, Process};
pub use state::{SimulationState, TrajectoryRow};
