use crate::state::StateKey;
use thiserror::Error;

/// Errors surfaced by the simulation core.
///
/// Numeric degeneracy (division by a zero total, NaN) is not represented
/// here: it is caught at the point of computation and replaced with a
/// deterministic 0.0 fallback, never propagated.
#[derive(Error, Debug, Clone)]
pub enum SimError {
    /// Malformed parameter sweep or inconsistent static configuration.
    /// Detected before any run starts.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A block reads a state key that neither the initial state nor any
    /// earlier block defines. Structural bug, caught by the pre-flight
    /// check before any run starts.
    #[error("block '{block}' reads state key {key:?} before any earlier block defines it")]
    StateDependency { block: &'static str, key: StateKey },

    /// A policy or update function failed at runtime. Aborts only the run
    /// in which it occurred.
    #[error("execution failed in block '{block}': {message}")]
    RuntimeExecution {
        block: &'static str,
        message: String,
    },
}

impl SimError {
    pub fn runtime(block: &'static str, message: impl Into<String>) -> Self {
        SimError::RuntimeExecution {
            block,
            message: message.into(),
        }
    }
}
