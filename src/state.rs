//! The fixed-schema per-timestep simulation state, its initial-state
//! builder, and the state-key vocabulary used by the scheduler's static
//! dependency check.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use serde::Serialize;

use crate::constants::MIN_EXPOSURE;
use crate::error::SimError;
use crate::matrix::Matrix;
use crate::params::ParameterSet;
use crate::parts::supernets::reallocate_fragmentation;
use crate::stochastic;
use crate::types::{Stage, StakingMode};

// ------------------------------------------------------------------------------------------------
// State keys
// ------------------------------------------------------------------------------------------------

/// Names of state groups a scheduler block can declare in its read/write
/// sets. Groups bundle the scalar fields that are always written together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    Stage,
    Timestamp,
    Price,
    Supply,
    SupplyInflation,
    NetworkIssuance,
    StakedTotal,
    StakedPerValidator,
    StakeMatrix,
    RiskMask,
    Liveness,
    FragmentationWeights,
    CheckpointCadence,
    ChainCounts,
    DeviateMask,
    UnassignedRewardsRatio,
    TransactionFees,
    InflationRewards,
    OnlineRewards,
    ValidatorCosts,
    ValidatorYields,
    CentralizationMetrics,
    MonopolyMetrics,
}

/// Keys defined by the initial state. Derived per-timestep outputs
/// (fees, rewards, costs, yields, centralization) are only defined once the
/// block that computes them has run.
pub const INITIAL_KEYS: &[StateKey] = &[
    StateKey::Stage,
    StateKey::Timestamp,
    StateKey::Price,
    StateKey::Supply,
    StateKey::StakedTotal,
    StateKey::StakedPerValidator,
    StateKey::StakeMatrix,
    StateKey::RiskMask,
    StateKey::Liveness,
    StateKey::FragmentationWeights,
    StateKey::CheckpointCadence,
    StateKey::ChainCounts,
    StateKey::DeviateMask,
    StateKey::UnassignedRewardsRatio,
];

// ------------------------------------------------------------------------------------------------
// Simulation state
// ------------------------------------------------------------------------------------------------

/// Full state of one run at one timestep. Mutated strictly by the
/// scheduler's ordered update functions; every run owns its state
/// exclusively.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationState {
    pub stage: Stage,
    pub timestamp: DateTime<Utc>,
    /// Token spot price in USD
    pub price: f64,
    /// Total token supply
    pub supply: f64,
    /// Annualized supply inflation realized this timestep
    pub supply_inflation: f64,
    /// Net token issuance this timestep
    pub network_issuance: f64,
    /// Sum of all validator stake
    pub staked_total: f64,
    /// Total stake held by each validator
    pub staked_per_validator: Vec<f64>,
    pub num_validators: usize,
    pub public_chains: usize,
    pub private_chains: usize,
    /// Chains x validators exposure matrix
    pub stake_matrix: Matrix,
    /// Chains x validators 0/1 participation mask
    pub risk_mask: Matrix,
    /// Chains x validators liveness fractions in [0, 1]
    pub liveness: Matrix,
    /// Chains x validators Poisson weights (fragmentation mode)
    pub fragmentation_weights: Matrix,
    /// Per-chain checkpoint submission cadence in epochs
    pub checkpoint_cadence: Vec<f64>,
    /// Validators slashed by the large-service event
    pub deviate_mask: Vec<bool>,
    /// Fraction of issuance withheld on the slashing timestep
    pub unassigned_rewards_ratio: f64,

    // Transaction fees
    pub total_txn_fees: f64,
    pub total_txn_fees_usd: f64,

    // Inflation rewards
    pub total_inflation_to_validators: f64,
    pub total_inflation_to_validators_usd: f64,
    pub total_inflation_normal: f64,
    pub total_inflation_normal_usd: f64,
    pub total_inflation_deviate: f64,
    pub total_inflation_deviate_usd: f64,
    pub total_online_rewards: f64,

    // Costs
    pub validator_count_distribution: Vec<f64>,
    pub hardware_costs: f64,
    pub checkpoint_costs: f64,
    pub total_network_costs: f64,

    // Revenue, profit, and annualized yields
    pub total_revenue: f64,
    pub total_profit: f64,
    pub total_revenue_yields: f64,
    pub total_profit_yields: f64,
    pub hardware_costs_yields: f64,
    pub checkpoint_costs_yields: f64,
    pub txn_fee_yields: f64,
    pub inflation_yields: f64,
    pub inflation_normal_yields: f64,
    pub inflation_deviate_yields: f64,

    // Centralization metrics
    pub attack_nodes_51: Vec<u32>,
    pub attack_nodes_33: Vec<u32>,
    pub total_top_51_control: u32,
    pub total_top_33_control: u32,
    pub avg_gini: f64,
    pub avg_hhi: f64,
    pub multi_chain_attackers_51: Vec<bool>,
    pub multi_chain_attackers_33: Vec<bool>,
    pub num_multi_chain_attackers_51: usize,
    pub num_multi_chain_attackers_33: usize,
    pub monopoly_51: f64,
    pub monopoly_33: f64,
    /// Stake at risk if every large service were slashed at once
    pub slashable_stake_large_service: f64,
}

impl SimulationState {
    pub fn total_chains(&self) -> usize {
        self.public_chains + self.private_chains
    }
}

/// One flat output row: the full state of `(subset, run)` at `timestep`.
#[derive(Debug, Clone, Serialize)]
pub struct TrajectoryRow {
    pub subset: usize,
    pub run: usize,
    pub timestep: usize,
    #[serde(flatten)]
    pub state: SimulationState,
}

/// Floors sub-threshold exposures to zero. Applied after every stake
/// matrix mutation.
pub fn apply_exposure_floor(stake_matrix: &mut Matrix) {
    stake_matrix.map_inplace(|v| if v < MIN_EXPOSURE { 0.0 } else { v });
}

/// Builds the t = 0 state from the initial per-validator stake vector,
/// sampling the participation masks, fragmentation weights, liveness, and
/// checkpoint cadences from the run's RNG stream.
pub fn initial_state(
    params: &ParameterSet,
    initial_stake: &[f64],
    rng: &mut StdRng,
) -> Result<SimulationState, SimError> {
    if initial_stake.is_empty() {
        return Err(SimError::Configuration(
            "initial stake vector must not be empty".into(),
        ));
    }
    if initial_stake.iter().any(|&s| !s.is_finite() || s < 0.0) {
        return Err(SimError::Configuration(
            "initial stake vector must be finite and nonnegative".into(),
        ));
    }

    let num_validators = initial_stake.len();
    let chains = params.initial_chains();

    // Participation mask: public chains always recruit every validator,
    // private chains recruit with a fixed low probability.
    let mut risk_rows = Vec::with_capacity(chains);
    for chain in 0..chains {
        let p = if chain < params.public_chains {
            1.0
        } else {
            params.private_participation_prob
        };
        risk_rows.push(stochastic::sample_risk_row(
            p,
            num_validators,
            params.min_validators_per_chain,
            rng,
        ));
    }
    let risk_mask = Matrix::from_rows(risk_rows);

    let staked_per_validator: Vec<f64> = initial_stake.to_vec();
    let staked_total: f64 = staked_per_validator.iter().sum();

    let fragmentation_weights = match params.staking_mode {
        StakingMode::SingleStaking => {
            let rows = (0..chains)
                .map(|_| stochastic::sample_poisson_row(5.0, num_validators, rng))
                .collect();
            Matrix::from_rows(rows)
        }
        StakingMode::MultiStaking => Matrix::zeros(chains, num_validators),
    };

    let mut stake_matrix = match params.staking_mode {
        StakingMode::MultiStaking => {
            let rows = (0..chains)
                .map(|chain| {
                    (0..num_validators)
                        .map(|v| risk_mask.get(chain, v) * staked_per_validator[v])
                        .collect()
                })
                .collect();
            Matrix::from_rows(rows)
        }
        StakingMode::SingleStaking => {
            reallocate_fragmentation(&fragmentation_weights, &staked_per_validator)
        }
    };
    apply_exposure_floor(&mut stake_matrix);

    let liveness = stochastic::sample_liveness_matrix(chains, num_validators, params.dt, 0.95, rng);
    let checkpoint_cadence = stochastic::sample_cadence(chains, rng);

    Ok(SimulationState {
        stage: Stage::Normal,
        timestamp: params.date_start,
        price: 1.0,
        supply: params.initial_supply,
        supply_inflation: 0.0,
        network_issuance: 0.0,
        staked_total,
        staked_per_validator,
        num_validators,
        public_chains: params.public_chains,
        private_chains: params.private_chains,
        stake_matrix,
        risk_mask,
        liveness,
        fragmentation_weights,
        checkpoint_cadence,
        deviate_mask: vec![false; num_validators],
        unassigned_rewards_ratio: 0.0,
        total_txn_fees: 0.0,
        total_txn_fees_usd: 0.0,
        total_inflation_to_validators: 0.0,
        total_inflation_to_validators_usd: 0.0,
        total_inflation_normal: 0.0,
        total_inflation_normal_usd: 0.0,
        total_inflation_deviate: 0.0,
        total_inflation_deviate_usd: 0.0,
        total_online_rewards: 0.0,
        validator_count_distribution: vec![0.0; params.validator_environments.len()],
        hardware_costs: 0.0,
        checkpoint_costs: 0.0,
        total_network_costs: 0.0,
        total_revenue: 0.0,
        total_profit: 0.0,
        total_revenue_yields: 0.0,
        total_profit_yields: 0.0,
        hardware_costs_yields: 0.0,
        checkpoint_costs_yields: 0.0,
        txn_fee_yields: 0.0,
        inflation_yields: 0.0,
        inflation_normal_yields: 0.0,
        inflation_deviate_yields: 0.0,
        attack_nodes_51: vec![0; chains],
        attack_nodes_33: vec![0; chains],
        total_top_51_control: 0,
        total_top_33_control: 0,
        avg_gini: 0.0,
        avg_hhi: 0.0,
        multi_chain_attackers_51: vec![false; num_validators],
        multi_chain_attackers_33: vec![false; num_validators],
        num_multi_chain_attackers_51: 0,
        num_multi_chain_attackers_33: 0,
        monopoly_51: 0.0,
        monopoly_33: 0.0,
        slashable_stake_large_service: 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterSweep;
    use rand::SeedableRng;

    fn params_with_mode(mode: StakingMode) -> ParameterSet {
        let mut sweep = ParameterSweep::default();
        sweep.staking_mode = crate::params::Sweep::fixed(mode);
        sweep.subsets().unwrap().remove(0)
    }

    #[test]
    fn test_initial_restaking_exposure_bounded_by_total() {
        let params = params_with_mode(StakingMode::MultiStaking);
        let stake = vec![1_000_000.0; 20];
        let mut rng = StdRng::seed_from_u64(5);
        let state = initial_state(&params, &stake, &mut rng).unwrap();
        for chain in 0..state.total_chains() {
            for v in 0..20 {
                assert!(state.stake_matrix.get(chain, v) <= state.staked_per_validator[v]);
            }
        }
        // public chain rows carry full stake for every validator
        assert_eq!(state.stake_matrix.row(0), &stake[..]);
    }

    #[test]
    fn test_initial_fragmentation_partitions_stake() {
        let params = params_with_mode(StakingMode::SingleStaking);
        let stake = vec![10_000_000.0; 12];
        let mut rng = StdRng::seed_from_u64(5);
        let state = initial_state(&params, &stake, &mut rng).unwrap();
        for v in 0..12 {
            let col_total = state.stake_matrix.col_sum(v);
            // partition invariant, modulo the sub-threshold exposure floor
            assert!(col_total <= stake[v] + 1e-6);
        }
    }

    #[test]
    fn test_initial_liveness_uses_configured_timescale() {
        let params = params_with_mode(StakingMode::MultiStaking);
        let stake = vec![1_000_000.0; 15];
        let mut rng = StdRng::seed_from_u64(4);
        let state = initial_state(&params, &stake, &mut rng).unwrap();
        // Binomial(dt, p) / dt: every entry is a multiple of 1/dt
        for row in state.liveness.row_iter() {
            for &v in row {
                assert!((0.0..=1.0).contains(&v));
                let scaled = v * params.dt as f64;
                assert!((scaled - scaled.round()).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_initial_state_rejects_empty_stake() {
        let params = params_with_mode(StakingMode::MultiStaking);
        let mut rng = StdRng::seed_from_u64(5);
        assert!(initial_state(&params, &[], &mut rng).is_err());
    }

    #[test]
    fn test_exposure_floor() {
        let mut m = Matrix::from_rows(vec![vec![179_999.0, 180_000.0, 1e6]]);
        apply_exposure_floor(&mut m);
        assert_eq!(m.row(0), &[0.0, 180_000.0, 1e6]);
    }
}
