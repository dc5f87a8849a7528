//! The ordered state-update schedule.
//!
//! Each block declares the state keys it reads and writes; the pre-flight
//! check in `pipeline` uses those declarations to reject a schedule whose
//! blocks read keys nothing earlier defines. Execution order is fixed by
//! [`SCHEDULE`] and never depends on data.

use chrono::Duration;
use rand::rngs::StdRng;

use crate::constants;
use crate::error::SimError;
use crate::params::ParameterSet;
use crate::parts::{decentralization, events, hub, staking, supernets, system_metrics};
use crate::state::{SimulationState, StateKey};
use crate::types::StakingMode;

/// One named step of the per-timestep schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    StageAndTime,
    PriceUpdate,
    SlashingEvent,
    SupernetAdoption,
    RestakingSample,
    LivenessCheck,
    TransactionPricing,
    Inflation,
    OnlineRewards,
    IssuanceAccounting,
    ValidatorCosts,
    ValidatorYields,
    Centralization,
    Monopoly,
}

/// The full schedule, executed top to bottom once per timestep.
pub const SCHEDULE: [Block; 14] = [
    Block::StageAndTime,
    Block::PriceUpdate,
    Block::SlashingEvent,
    Block::SupernetAdoption,
    Block::RestakingSample,
    Block::LivenessCheck,
    Block::TransactionPricing,
    Block::Inflation,
    Block::OnlineRewards,
    Block::IssuanceAccounting,
    Block::ValidatorCosts,
    Block::ValidatorYields,
    Block::Centralization,
    Block::Monopoly,
];

impl Block {
    pub fn name(&self) -> &'static str {
        match self {
            Block::StageAndTime => "stage_and_time",
            Block::PriceUpdate => "price_update",
            Block::SlashingEvent => "slashing_event",
            Block::SupernetAdoption => "supernet_adoption",
            Block::RestakingSample => "restaking_sample",
            Block::LivenessCheck => "liveness_check",
            Block::TransactionPricing => "transaction_pricing",
            Block::Inflation => "inflation",
            Block::OnlineRewards => "online_rewards",
            Block::IssuanceAccounting => "issuance_accounting",
            Block::ValidatorCosts => "validator_costs",
            Block::ValidatorYields => "validator_yields",
            Block::Centralization => "centralization",
            Block::Monopoly => "monopoly",
        }
    }

    /// State keys this block reads from the previous blocks' output.
    pub fn reads(&self) -> &'static [StateKey] {
        match self {
            Block::StageAndTime => &[],
            Block::PriceUpdate => &[],
            Block::SlashingEvent => &[
                StateKey::Stage,
                StateKey::Timestamp,
                StateKey::StakeMatrix,
                StateKey::StakedTotal,
                StateKey::StakedPerValidator,
            ],
            Block::SupernetAdoption => &[
                StateKey::ChainCounts,
                StateKey::StakeMatrix,
                StateKey::RiskMask,
                StateKey::FragmentationWeights,
                StateKey::Liveness,
                StateKey::CheckpointCadence,
                StateKey::StakedPerValidator,
            ],
            Block::RestakingSample => &[
                StateKey::StakeMatrix,
                StateKey::RiskMask,
                StateKey::FragmentationWeights,
                StateKey::StakedPerValidator,
            ],
            Block::LivenessCheck => &[StateKey::ChainCounts],
            Block::TransactionPricing => &[StateKey::Price, StateKey::ChainCounts],
            Block::Inflation => &[
                StateKey::Supply,
                StateKey::StakedTotal,
                StateKey::StakeMatrix,
                StateKey::Liveness,
                StateKey::DeviateMask,
                StateKey::UnassignedRewardsRatio,
                StateKey::Price,
            ],
            Block::OnlineRewards => &[StateKey::InflationRewards, StateKey::TransactionFees],
            Block::IssuanceAccounting => &[StateKey::InflationRewards, StateKey::Supply],
            Block::ValidatorCosts => &[StateKey::ChainCounts, StateKey::CheckpointCadence],
            Block::ValidatorYields => &[
                StateKey::OnlineRewards,
                StateKey::Price,
                StateKey::StakedTotal,
                StateKey::StakedPerValidator,
                StateKey::ValidatorCosts,
                StateKey::TransactionFees,
                StateKey::InflationRewards,
                StateKey::DeviateMask,
            ],
            Block::Centralization => &[StateKey::StakeMatrix, StateKey::ChainCounts],
            Block::Monopoly => &[
                StateKey::StakeMatrix,
                StateKey::CentralizationMetrics,
                StateKey::ChainCounts,
                StateKey::StakedPerValidator,
            ],
        }
    }

    /// State keys this block overwrites.
    pub fn writes(&self) -> &'static [StateKey] {
        match self {
            Block::StageAndTime => &[StateKey::Timestamp],
            Block::PriceUpdate => &[StateKey::Price],
            Block::SlashingEvent => &[
                StateKey::Stage,
                StateKey::StakeMatrix,
                StateKey::StakedTotal,
                StateKey::StakedPerValidator,
                StateKey::DeviateMask,
                StateKey::UnassignedRewardsRatio,
            ],
            Block::SupernetAdoption => &[
                StateKey::ChainCounts,
                StateKey::StakeMatrix,
                StateKey::RiskMask,
                StateKey::FragmentationWeights,
                StateKey::Liveness,
                StateKey::CheckpointCadence,
            ],
            Block::RestakingSample => &[StateKey::StakeMatrix],
            Block::LivenessCheck => &[StateKey::Liveness],
            Block::TransactionPricing => &[StateKey::TransactionFees],
            Block::Inflation => &[StateKey::InflationRewards],
            Block::OnlineRewards => &[StateKey::OnlineRewards],
            Block::IssuanceAccounting => &[
                StateKey::Supply,
                StateKey::NetworkIssuance,
                StateKey::SupplyInflation,
            ],
            Block::ValidatorCosts => &[StateKey::ValidatorCosts],
            Block::ValidatorYields => &[StateKey::ValidatorYields],
            Block::Centralization => &[StateKey::CentralizationMetrics],
            Block::Monopoly => &[StateKey::MonopolyMetrics],
        }
    }

    /// Runs the block against the state for `(run, timestep)`.
    pub fn execute(
        &self,
        state: &mut SimulationState,
        params: &ParameterSet,
        run: usize,
        timestep: usize,
        rng: &mut StdRng,
    ) -> Result<(), SimError> {
        match self {
            Block::StageAndTime => {
                let days =
                    (timestep * params.dt) as f64 / constants::EPOCHS_PER_DAY;
                let seconds = (days * constants::SECONDS_PER_DAY) as i64;
                state.timestamp = params.date_start + Duration::seconds(seconds);
            }
            Block::PriceUpdate => hub::update_price(state, params, run, timestep),
            Block::SlashingEvent => events::apply_slashing(state, params, rng)?,
            Block::SupernetAdoption => {
                let (new_public, new_private) = supernets::chain_arrivals(params, run, timestep);
                supernets::apply_chain_arrivals(state, params, new_public, new_private, rng);
            }
            Block::RestakingSample => {
                // fragmentation mode also re-derives exposures here so they
                // track slashed validator totals
                staking::resample_exposures(state, params, rng);
                if params.staking_mode == StakingMode::MultiStaking {
                    state.staked_total = state.staked_per_validator.iter().sum();
                }
            }
            Block::LivenessCheck => staking::refresh_liveness(state, params, rng),
            Block::TransactionPricing => {
                hub::update_transaction_fees(state, params, run, timestep)
            }
            Block::Inflation => hub::update_inflation(state, params),
            Block::OnlineRewards => system_metrics::update_online_rewards(state),
            Block::IssuanceAccounting => hub::update_issuance(state, params),
            Block::ValidatorCosts => system_metrics::update_costs(state, params, run, timestep),
            Block::ValidatorYields => system_metrics::update_yields(state, params),
            Block::Centralization => decentralization::update_centralization(state, params),
            Block::Monopoly => {
                decentralization::update_monopoly(state);
                decentralization::update_slashable_amount(state, params);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_order_is_fixed() {
        assert_eq!(SCHEDULE.len(), 14);
        assert_eq!(SCHEDULE[0], Block::StageAndTime);
        assert_eq!(SCHEDULE[2], Block::SlashingEvent);
        assert_eq!(SCHEDULE[13], Block::Monopoly);
    }

    #[test]
    fn test_block_names_are_unique() {
        let mut names: Vec<&str> = SCHEDULE.iter().map(|b| b.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), SCHEDULE.len());
    }
}
