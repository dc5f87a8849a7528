//! Stake allocation per timestep: the restaking Gaussian resample and the
//! per-(chain, validator) liveness refresh.

use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::params::ParameterSet;
use crate::state::{apply_exposure_floor, SimulationState};
use crate::stochastic;
use crate::types::StakingMode;

use super::supernets::reallocate_fragmentation;

/// Standard deviation of the per-timestep exposure noise.
const EXPOSURE_NOISE_SIGMA: f64 = 1e6;

/// Resamples the stake matrix for the current timestep.
///
/// Restaking: each participating validator's exposure is drawn fresh around
/// its full stake, `clamp(total + N(0, sigma), 0, total)`. Draws are
/// independent across timesteps; yesterday's exposure does not carry over.
/// Fragmentation: exposures are recomputed from the fixed Poisson weights so
/// they track the (possibly slashed) validator totals.
pub fn resample_exposures(state: &mut SimulationState, params: &ParameterSet, rng: &mut StdRng) {
    match params.staking_mode {
        StakingMode::MultiStaking => {
            let noise = Normal::new(0.0, EXPOSURE_NOISE_SIGMA)
                .expect("exposure noise sigma is finite and positive");
            for chain in 0..state.stake_matrix.rows() {
                for v in 0..state.stake_matrix.cols() {
                    let mask = state.risk_mask.get(chain, v);
                    if mask == 0.0 {
                        state.stake_matrix.set(chain, v, 0.0);
                        continue;
                    }
                    let total = state.staked_per_validator[v];
                    let drawn = (total + noise.sample(rng)).clamp(0.0, total);
                    state.stake_matrix.set(chain, v, drawn);
                }
            }
        }
        StakingMode::SingleStaking => {
            state.stake_matrix = reallocate_fragmentation(
                &state.fragmentation_weights,
                &state.staked_per_validator,
            );
        }
    }
    apply_exposure_floor(&mut state.stake_matrix);
}

/// Draws a fresh liveness matrix: `Binomial(dt, 0.95) / dt` per pair.
pub fn refresh_liveness(state: &mut SimulationState, params: &ParameterSet, rng: &mut StdRng) {
    state.liveness = stochastic::sample_liveness_matrix(
        state.total_chains(),
        state.num_validators,
        params.dt,
        0.95,
        rng,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ParameterSweep, Sweep};
    use crate::state::initial_state;
    use rand::SeedableRng;

    fn params_with_mode(mode: StakingMode) -> ParameterSet {
        let mut sweep = ParameterSweep::default();
        sweep.staking_mode = Sweep::fixed(mode);
        sweep.subsets().unwrap().remove(0)
    }

    #[test]
    fn test_restaking_resample_respects_bounds() {
        let params = params_with_mode(StakingMode::MultiStaking);
        let stake = vec![5_000_000.0; 25];
        let mut rng = StdRng::seed_from_u64(3);
        let mut state = initial_state(&params, &stake, &mut rng).unwrap();

        for _ in 0..10 {
            resample_exposures(&mut state, &params, &mut rng);
            for chain in 0..state.total_chains() {
                for v in 0..25 {
                    let e = state.stake_matrix.get(chain, v);
                    assert!(e >= 0.0);
                    assert!(e <= state.staked_per_validator[v]);
                    if state.risk_mask.get(chain, v) == 0.0 {
                        assert_eq!(e, 0.0);
                    }
                }
            }
        }
    }

    #[test]
    fn test_restaking_draws_do_not_depend_on_previous_exposure() {
        let params = params_with_mode(StakingMode::MultiStaking);
        let stake = vec![30_000_000.0; 25];
        let mut rng = StdRng::seed_from_u64(6);
        let mut state = initial_state(&params, &stake, &mut rng).unwrap();

        // wipe all exposure: a fresh draw must recover full-scale stake
        // immediately instead of creeping up from zero
        state.stake_matrix = crate::matrix::Matrix::zeros(state.total_chains(), 25);
        resample_exposures(&mut state, &params, &mut rng);
        for chain in 0..state.total_chains() {
            for v in 0..25 {
                if state.risk_mask.get(chain, v) == 1.0 {
                    let e = state.stake_matrix.get(chain, v);
                    assert!(e > 0.5 * state.staked_per_validator[v]);
                    assert!(e <= state.staked_per_validator[v]);
                }
            }
        }
    }

    #[test]
    fn test_fragmentation_resample_tracks_reduced_totals() {
        let params = params_with_mode(StakingMode::SingleStaking);
        let stake = vec![20_000_000.0; 10];
        let mut rng = StdRng::seed_from_u64(9);
        let mut state = initial_state(&params, &stake, &mut rng).unwrap();

        state.staked_per_validator[0] = 4_000_000.0;
        resample_exposures(&mut state, &params, &mut rng);
        assert!(state.stake_matrix.col_sum(0) <= 4_000_000.0 + 1e-6);
    }

    #[test]
    fn test_liveness_refresh_matches_dimensions() {
        let params = params_with_mode(StakingMode::MultiStaking);
        let stake = vec![1_000_000.0; 8];
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = initial_state(&params, &stake, &mut rng).unwrap();
        refresh_liveness(&mut state, &params, &mut rng);
        assert_eq!(state.liveness.rows(), state.total_chains());
        assert_eq!(state.liveness.cols(), 8);
    }
}
