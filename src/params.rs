//! System parameters: the immutable per-run `ParameterSet` and the
//! list-valued `ParameterSweep` it is expanded from.
//!
//! Time-varying inputs are modeled as named processes indexed by
//! `(run, epoch)`. Stochastic processes are pre-generated per run before
//! scheduling begins, so reproducibility does not depend on execution order.

use chrono::{DateTime, TimeZone, Utc};
use std::fmt;
use std::sync::Arc;

use crate::error::SimError;
use crate::types::{Run, StakingMode, ValidatorEnvironment};

// ------------------------------------------------------------------------------------------------
// Processes
// ------------------------------------------------------------------------------------------------

/// A time-varying input `(run, epoch) -> value`.
///
/// `Samples` holds pre-generated trajectories, one per run; indices past the
/// end of a trajectory clamp to its last value.
#[derive(Clone)]
pub enum Process {
    /// The same value at every epoch of every run
    Constant(f64),
    /// Pre-generated per-run sample trajectories, indexed `[run][epoch]`
    Samples(Arc<Vec<Vec<f64>>>),
}

impl Process {
    pub fn samples(trajectories: Vec<Vec<f64>>) -> Self {
        Process::Samples(Arc::new(trajectories))
    }

    /// Value of the process for `run` at the given epoch.
    pub fn at(&self, run: Run, epoch: usize) -> f64 {
        match self {
            Process::Constant(v) => *v,
            Process::Samples(trajectories) => {
                if trajectories.is_empty() {
                    return 0.0;
                }
                let traj = &trajectories[run % trajectories.len()];
                match traj.get(epoch) {
                    Some(v) => *v,
                    None => *traj.last().unwrap_or(&0.0),
                }
            }
        }
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Process::Constant(v) => write!(f, "Constant({})", v),
            Process::Samples(t) => write!(f, "Samples({} runs)", t.len()),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Parameter set
// ------------------------------------------------------------------------------------------------

/// Static configuration for one run. Constructed once per run by expanding a
/// [`ParameterSweep`] and passed immutably through every policy call.
#[derive(Clone, Debug)]
pub struct ParameterSet {
    /// Simulation timescale: epochs per timestep
    pub dt: usize,
    /// Start date of the simulated trajectory
    pub date_start: DateTime<Utc>,
    /// Date at which the large-service slashing event fires
    pub date_slashing: DateTime<Utc>,
    /// Restaking vs. liquidity fragmentation
    pub staking_mode: StakingMode,
    /// Number of public chains at t = 0
    pub public_chains: usize,
    /// Number of private chains at t = 0
    pub private_chains: usize,
    /// Fixed annual inflation rate, used when the sqrt curve is disabled
    pub inflationary_rate_per_year: f64,
    /// Coefficient k of the sqrt issuance curve `rate = k / sqrt(staked)`;
    /// 0 disables the curve
    pub inflation_sqrt_numerator: f64,
    /// Fraction of exposure slashed on the attacked chain
    pub slashing_fraction: f64,
    /// Chains eligible as the slashing target, drawn uniformly on firing
    pub slashed_chain_candidates: Vec<usize>,
    /// Minimum number of distinct chains on which a validator must sit in an
    /// attack set to count as a multi-chain attacker
    pub min_attack_chains: usize,
    /// Probability that a validator participates on a newly created private chain
    pub private_participation_prob: f64,
    /// Every chain is guaranteed at least this many participating validators
    pub min_validators_per_chain: usize,
    /// Validator environment distribution, normalized to 100%
    pub validator_environments: Vec<ValidatorEnvironment>,
    /// Gas cost of one checkpoint submission
    pub checkpoint_gas_cost: f64,
    /// Base number of epochs per checkpoint submission
    pub epochs_per_checkpoint: f64,
    /// Spot price of the settlement token paying for checkpoint gas
    pub settlement_token_price: f64,
    /// Token supply at t = 0
    pub initial_supply: f64,

    // Named processes, all (run, epoch) -> value
    /// Token spot price in USD
    pub price_process: Process,
    /// New private chains per timestep
    pub adoption_speed_process: Process,
    /// New public chains per timestep
    pub adoption_speed_public_process: Process,
    /// Hardware cost per validator per month, USD
    pub hardware_cost_process: Process,
    /// Checkpoint submission fee, gwei per gas
    pub checkpoint_fee_process: Process,
    /// Transactions per second on one public chain
    pub public_txn_rate_process: Process,
    /// Transactions per second on one private chain
    pub private_txn_rate_process: Process,
    /// Fee per public chain transaction, USD
    pub public_txn_fee_process: Process,
    /// Fee per private chain transaction, USD
    pub private_txn_fee_process: Process,
}

impl ParameterSet {
    /// Total chains at t = 0.
    pub fn initial_chains(&self) -> usize {
        self.public_chains + self.private_chains
    }
}

// ------------------------------------------------------------------------------------------------
// Parameter sweep
// ------------------------------------------------------------------------------------------------

/// A list of values for one sweepable parameter.
///
/// Lists of length 1 broadcast across every subset; all longer lists must
/// share the common sweep length.
#[derive(Clone, Debug)]
pub struct Sweep<T>(pub Vec<T>);

impl<T: Clone> Sweep<T> {
    /// A parameter that takes the same value in every subset.
    pub fn fixed(value: T) -> Self {
        Sweep(vec![value])
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn pick(&self, subset: usize) -> T {
        if self.0.len() == 1 {
            self.0[0].clone()
        } else {
            self.0[subset].clone()
        }
    }
}

/// List-valued system parameters, expanded into one [`ParameterSet`] per
/// subset with zip-broadcast semantics before any run starts.
#[derive(Clone, Debug)]
pub struct ParameterSweep {
    pub dt: Sweep<usize>,
    pub date_start: Sweep<DateTime<Utc>>,
    pub date_slashing: Sweep<DateTime<Utc>>,
    pub staking_mode: Sweep<StakingMode>,
    pub public_chains: Sweep<usize>,
    pub private_chains: Sweep<usize>,
    pub inflationary_rate_per_year: Sweep<f64>,
    pub inflation_sqrt_numerator: Sweep<f64>,
    pub slashing_fraction: Sweep<f64>,
    pub price_process: Sweep<Process>,
    pub adoption_speed_process: Sweep<Process>,
    pub adoption_speed_public_process: Sweep<Process>,
    pub hardware_cost_process: Sweep<Process>,
    pub checkpoint_fee_process: Sweep<Process>,

    // Parameters that never sweep
    pub slashed_chain_candidates: Vec<usize>,
    pub min_attack_chains: usize,
    pub private_participation_prob: f64,
    pub min_validators_per_chain: usize,
    pub validator_environments: Vec<ValidatorEnvironment>,
    pub checkpoint_gas_cost: f64,
    pub epochs_per_checkpoint: f64,
    pub settlement_token_price: f64,
    pub initial_supply: f64,
    pub public_txn_rate_process: Process,
    pub private_txn_rate_process: Process,
    pub public_txn_fee_process: Process,
    pub private_txn_fee_process: Process,
}

impl Default for ParameterSweep {
    fn default() -> Self {
        Self {
            dt: Sweep::fixed(225),
            date_start: Sweep::fixed(Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap()),
            date_slashing: Sweep::fixed(Utc.with_ymd_and_hms(2023, 8, 4, 0, 0, 0).unwrap()),
            staking_mode: Sweep::fixed(StakingMode::MultiStaking),
            public_chains: Sweep::fixed(2),
            private_chains: Sweep::fixed(2),
            inflationary_rate_per_year: Sweep::fixed(0.01),
            inflation_sqrt_numerator: Sweep::fixed(0.0),
            slashing_fraction: Sweep::fixed(0.1),
            price_process: Sweep::fixed(Process::Constant(1.0)),
            adoption_speed_process: Sweep::fixed(Process::Constant(1.0)),
            adoption_speed_public_process: Sweep::fixed(Process::Constant(0.0)),
            hardware_cost_process: Sweep::fixed(Process::Constant(500.0)),
            checkpoint_fee_process: Sweep::fixed(Process::Constant(12.0)),
            slashed_chain_candidates: vec![0, 1, 2],
            min_attack_chains: 2,
            private_participation_prob: 0.15,
            min_validators_per_chain: 6,
            validator_environments: vec![ValidatorEnvironment::new("custom", 1.0)],
            checkpoint_gas_cost: crate::constants::CHECKPOINT_GAS_COST,
            epochs_per_checkpoint: 1.0,
            settlement_token_price: 1500.0,
            initial_supply: 10_000_000_000.0,
            public_txn_rate_process: Process::Constant(38.0),
            private_txn_rate_process: Process::Constant(19.0),
            public_txn_fee_process: Process::Constant(0.01),
            private_txn_fee_process: Process::Constant(0.001),
        }
    }
}

impl ParameterSweep {
    /// Number of parameter subsets. Every list-valued parameter must have
    /// length 1 or this common length.
    pub fn sweep_len(&self) -> Result<usize, SimError> {
        let lens = [
            ("dt", self.dt.len()),
            ("date_start", self.date_start.len()),
            ("date_slashing", self.date_slashing.len()),
            ("staking_mode", self.staking_mode.len()),
            ("public_chains", self.public_chains.len()),
            ("private_chains", self.private_chains.len()),
            (
                "inflationary_rate_per_year",
                self.inflationary_rate_per_year.len(),
            ),
            (
                "inflation_sqrt_numerator",
                self.inflation_sqrt_numerator.len(),
            ),
            ("slashing_fraction", self.slashing_fraction.len()),
            ("price_process", self.price_process.len()),
            ("adoption_speed_process", self.adoption_speed_process.len()),
            (
                "adoption_speed_public_process",
                self.adoption_speed_public_process.len(),
            ),
            ("hardware_cost_process", self.hardware_cost_process.len()),
            ("checkpoint_fee_process", self.checkpoint_fee_process.len()),
        ];

        let mut common = 1usize;
        for (name, len) in lens {
            if len == 0 {
                return Err(SimError::Configuration(format!(
                    "parameter '{}' has an empty value list",
                    name
                )));
            }
            if len > 1 {
                if common > 1 && len != common {
                    return Err(SimError::Configuration(format!(
                        "parameter '{}' has {} values but the sweep length is {}",
                        name, len, common
                    )));
                }
                common = len;
            }
        }
        Ok(common)
    }

    /// Expands the sweep into one parameter set per subset.
    pub fn subsets(&self) -> Result<Vec<ParameterSet>, SimError> {
        let n = self.sweep_len()?;
        let mut sets = Vec::with_capacity(n);
        for i in 0..n {
            let set = ParameterSet {
                dt: self.dt.pick(i),
                date_start: self.date_start.pick(i),
                date_slashing: self.date_slashing.pick(i),
                staking_mode: self.staking_mode.pick(i),
                public_chains: self.public_chains.pick(i),
                private_chains: self.private_chains.pick(i),
                inflationary_rate_per_year: self.inflationary_rate_per_year.pick(i),
                inflation_sqrt_numerator: self.inflation_sqrt_numerator.pick(i),
                slashing_fraction: self.slashing_fraction.pick(i),
                slashed_chain_candidates: self.slashed_chain_candidates.clone(),
                min_attack_chains: self.min_attack_chains,
                private_participation_prob: self.private_participation_prob,
                min_validators_per_chain: self.min_validators_per_chain,
                validator_environments: crate::types::normalize_environments(
                    self.validator_environments.clone(),
                ),
                checkpoint_gas_cost: self.checkpoint_gas_cost,
                epochs_per_checkpoint: self.epochs_per_checkpoint,
                settlement_token_price: self.settlement_token_price,
                initial_supply: self.initial_supply,
                price_process: self.price_process.pick(i),
                adoption_speed_process: self.adoption_speed_process.pick(i),
                adoption_speed_public_process: self.adoption_speed_public_process.pick(i),
                hardware_cost_process: self.hardware_cost_process.pick(i),
                checkpoint_fee_process: self.checkpoint_fee_process.pick(i),
                public_txn_rate_process: self.public_txn_rate_process.clone(),
                private_txn_rate_process: self.private_txn_rate_process.clone(),
                public_txn_fee_process: self.public_txn_fee_process.clone(),
                private_txn_fee_process: self.private_txn_fee_process.clone(),
            };
            if set.dt == 0 {
                return Err(SimError::Configuration("dt must be positive".into()));
            }
            if set.initial_chains() == 0 {
                return Err(SimError::Configuration(
                    "at least one initial chain is required".into(),
                ));
            }
            if !(0.0..=1.0).contains(&set.slashing_fraction) {
                return Err(SimError::Configuration(
                    "slashing_fraction must be between 0 and 1".into(),
                ));
            }
            sets.push(set);
        }
        Ok(sets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_constant_and_samples() {
        let c = Process::Constant(3.5);
        assert_eq!(c.at(0, 0), 3.5);
        assert_eq!(c.at(4, 999), 3.5);

        let s = Process::samples(vec![vec![1.0, 2.0], vec![10.0, 20.0]]);
        assert_eq!(s.at(0, 1), 2.0);
        assert_eq!(s.at(1, 0), 10.0);
        // past-the-end epochs clamp to the last sample
        assert_eq!(s.at(0, 100), 2.0);
    }

    #[test]
    fn test_sweep_broadcast() {
        let mut sweep = ParameterSweep::default();
        sweep.slashing_fraction = Sweep(vec![0.05, 0.1, 0.2]);
        let subsets = sweep.subsets().unwrap();
        assert_eq!(subsets.len(), 3);
        assert_eq!(subsets[2].slashing_fraction, 0.2);
        // broadcast parameters repeat in every subset
        assert_eq!(subsets[0].dt, subsets[2].dt);
    }

    #[test]
    fn test_sweep_mismatched_cardinality() {
        let mut sweep = ParameterSweep::default();
        sweep.slashing_fraction = Sweep(vec![0.05, 0.1, 0.2]);
        sweep.inflationary_rate_per_year = Sweep(vec![0.01, 0.02]);
        match sweep.subsets() {
            Err(SimError::Configuration(_)) => {}
            other => panic!("expected configuration error, got {:?}", other.map(|s| s.len())),
        }
    }

    #[test]
    fn test_sweep_rejects_zero_dt() {
        let mut sweep = ParameterSweep::default();
        sweep.dt = Sweep::fixed(0);
        assert!(sweep.subsets().is_err());
    }
}
