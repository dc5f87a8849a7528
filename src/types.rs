use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a Monte Carlo repetition within one parameter subset
pub type Run = usize;

/// Index of a simulation timestep (one timestep = `dt` epochs)
pub type Timestep = usize;

/// Token amounts, in whole token units
pub type Token = f64;

/// Dollar amounts
pub type Usd = f64;

/// Stage of the slashing event state machine. The transition is one-shot:
/// once a run reaches `Slashed` it never recovers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    /// No slashing event has fired yet
    Normal,
    /// The large-service slashing event has fired
    Slashed,
}

/// How validator stake is allocated across chains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StakingMode {
    /// Restaking: one validator's stake collateralizes multiple chains simultaneously
    MultiStaking,
    /// Liquidity fragmentation: stake is partitioned, not shared, across chains
    SingleStaking,
}

impl StakingMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "MultiStaking" => Some(StakingMode::MultiStaking),
            "SingleStaking" => Some(StakingMode::SingleStaking),
            _ => None,
        }
    }
}

impl fmt::Display for StakingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StakingMode::MultiStaking => write!(f, "MultiStaking"),
            StakingMode::SingleStaking => write!(f, "SingleStaking"),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Normal => write!(f, "Normal"),
            Stage::Slashed => write!(f, "Slashed"),
        }
    }
}

/// One validator operating environment (hardware profile) and its share of
/// the validator population.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorEnvironment {
    /// Environment label, e.g. "custom" or "diy_hardware"
    pub label: String,
    /// Fraction of validators operating in this environment
    pub percentage_distribution: f64,
}

impl ValidatorEnvironment {
    pub fn new(label: &str, percentage_distribution: f64) -> Self {
        Self {
            label: label.to_string(),
            percentage_distribution,
        }
    }
}

/// Normalizes environment shares to a total of 1.0, logging when the input
/// did not already sum to 100%.
pub fn normalize_environments(mut envs: Vec<ValidatorEnvironment>) -> Vec<ValidatorEnvironment> {
    let total: f64 = envs.iter().map(|e| e.percentage_distribution).sum();
    if total > 0.0 && (total - 1.0).abs() > 1e-9 {
        log::warn!(
            "validator environment distribution sums to {}, normalizing to 100%",
            total
        );
        for env in envs.iter_mut() {
            env.percentage_distribution /= total;
        }
    }
    envs
}
