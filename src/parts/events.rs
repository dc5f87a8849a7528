//! The one-shot large-service slashing event.
//!
//! Stage machine: every run starts NORMAL; on the first timestep whose
//! timestamp reaches the configured slashing date the event fires, slashes
//! one target chain, and the run stays SLASHED for its remainder.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::SimError;
use crate::params::ParameterSet;
use crate::state::{apply_exposure_floor, SimulationState};
use crate::types::Stage;

/// Applies the slashing state machine for this timestep.
///
/// The unassigned-rewards ratio is nonzero only on the timestep the event
/// fires; it is reset first so later timesteps pay full rewards again.
pub fn apply_slashing(
    state: &mut SimulationState,
    params: &ParameterSet,
    rng: &mut StdRng,
) -> Result<(), SimError> {
    state.unassigned_rewards_ratio = 0.0;

    if state.stage != Stage::Normal || state.timestamp < params.date_slashing {
        return Ok(());
    }

    let candidates: Vec<usize> = params
        .slashed_chain_candidates
        .iter()
        .copied()
        .filter(|&c| c < state.total_chains())
        .collect();
    let target = *candidates.choose(rng).ok_or_else(|| {
        SimError::runtime(
            "slashing_event",
            "no slashing candidate chain exists in the current chain set",
        )
    })?;

    // Mark who was exposed on the target chain before any stake moves.
    for v in 0..state.num_validators {
        state.deviate_mask[v] = state.stake_matrix.get(target, v) != 0.0;
    }

    let slash: Vec<f64> = (0..state.num_validators)
        .map(|v| state.stake_matrix.get(target, v) * params.slashing_fraction)
        .collect();
    let total_stake = state.stake_matrix.sum();
    state.unassigned_rewards_ratio = if total_stake > 0.0 {
        slash.iter().sum::<f64>() / total_stake
    } else {
        0.0
    };

    for v in 0..state.num_validators {
        let remaining = state.stake_matrix.get(target, v) - slash[v];
        state.stake_matrix.set(target, v, remaining.max(0.0));
        state.staked_per_validator[v] = (state.staked_per_validator[v] - slash[v]).max(0.0);
        // no chain may hold more than the validator's remaining total
        for chain in 0..state.total_chains() {
            let capped = state
                .stake_matrix
                .get(chain, v)
                .min(state.staked_per_validator[v]);
            state.stake_matrix.set(chain, v, capped);
        }
    }
    apply_exposure_floor(&mut state.stake_matrix);
    state.staked_total = state.staked_per_validator.iter().sum();
    state.stage = Stage::Slashed;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ParameterSweep, Sweep};
    use crate::state::initial_state;
    use chrono::{Duration, TimeZone, Utc};
    use rand::SeedableRng;

    fn params() -> ParameterSet {
        let mut sweep = ParameterSweep::default();
        sweep.date_start = Sweep::fixed(Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap());
        sweep.date_slashing = Sweep::fixed(Utc.with_ymd_and_hms(2023, 6, 5, 0, 0, 0).unwrap());
        sweep.subsets().unwrap().remove(0)
    }

    #[test]
    fn test_no_slash_before_date() {
        let params = params();
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = initial_state(&params, &vec![1e7; 20], &mut rng).unwrap();
        apply_slashing(&mut state, &params, &mut rng).unwrap();
        assert_eq!(state.stage, Stage::Normal);
        assert_eq!(state.unassigned_rewards_ratio, 0.0);
    }

    #[test]
    fn test_slash_fires_exactly_once() {
        let params = params();
        let mut rng = StdRng::seed_from_u64(2);
        let mut state = initial_state(&params, &vec![1e7; 20], &mut rng).unwrap();
        state.timestamp = params.date_slashing + Duration::days(1);

        let total_before = state.staked_total;
        apply_slashing(&mut state, &params, &mut rng).unwrap();
        assert_eq!(state.stage, Stage::Slashed);
        assert!(state.unassigned_rewards_ratio > 0.0);
        assert!(state.staked_total < total_before);
        assert!(state.deviate_mask.iter().any(|&d| d));

        // second pass is a no-op and clears the withheld ratio
        let total_after = state.staked_total;
        apply_slashing(&mut state, &params, &mut rng).unwrap();
        assert_eq!(state.unassigned_rewards_ratio, 0.0);
        assert_eq!(state.staked_total, total_after);
    }

    #[test]
    fn test_slash_preserves_exposure_bound() {
        let params = params();
        let mut rng = StdRng::seed_from_u64(3);
        let mut state = initial_state(&params, &vec![1e7; 20], &mut rng).unwrap();
        state.timestamp = params.date_slashing;
        apply_slashing(&mut state, &params, &mut rng).unwrap();
        for chain in 0..state.total_chains() {
            for v in 0..state.num_validators {
                assert!(state.stake_matrix.get(chain, v) <= state.staked_per_validator[v] + 1e-9);
            }
        }
    }

    #[test]
    fn test_slash_without_candidates_is_a_run_error() {
        let mut sweep = ParameterSweep::default();
        sweep.slashed_chain_candidates = vec![99];
        let params = sweep.subsets().unwrap().remove(0);
        let mut rng = StdRng::seed_from_u64(4);
        let mut state = initial_state(&params, &vec![1e7; 20], &mut rng).unwrap();
        state.timestamp = params.date_slashing;
        assert!(apply_slashing(&mut state, &params, &mut rng).is_err());
    }
}
