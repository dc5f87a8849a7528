//! Supernet adoption: new-chain arrival and the fragmentation-mode stake
//! reallocation shared with the initial-state builder.

use rand::rngs::StdRng;

use crate::matrix::Matrix;
use crate::params::ParameterSet;
use crate::state::{apply_exposure_floor, SimulationState};
use crate::stochastic;
use crate::types::StakingMode;

/// Splits each validator's total stake across chains in proportion to the
/// fragmentation weights. A validator with zero total weight (or zero
/// stake) gets zero exposure everywhere rather than NaN.
pub fn reallocate_fragmentation(weights: &Matrix, totals: &[f64]) -> Matrix {
    let chains = weights.rows();
    let validators = weights.cols();
    let weight_sums = weights.col_sums();

    let mut exposure = Matrix::zeros(chains, validators);
    for chain in 0..chains {
        for v in 0..validators {
            if weight_sums[v] > 0.0 {
                let share = weights.get(chain, v) / weight_sums[v];
                exposure.set(chain, v, share * totals[v]);
            }
        }
    }
    exposure
}

/// New chains arriving this timestep, from the public and private adoption
/// processes sampled at the previous timestep's epoch.
pub fn chain_arrivals(
    params: &ParameterSet,
    run: usize,
    timestep: usize,
) -> (usize, usize) {
    let epoch = timestep.saturating_sub(1) * params.dt;
    let new_public = params.adoption_speed_public_process.at(run, epoch).max(0.0) as usize;
    let new_private = params.adoption_speed_process.at(run, epoch).max(0.0) as usize;
    (new_public, new_private)
}

/// Extends every per-chain state structure for the arriving chains. Public
/// chains are inserted after the existing public block so the chain index
/// ordering (public first, then private) is preserved.
pub fn apply_chain_arrivals(
    state: &mut SimulationState,
    params: &ParameterSet,
    new_public: usize,
    new_private: usize,
    rng: &mut StdRng,
) {
    if new_public == 0 && new_private == 0 {
        return;
    }
    let validators = state.num_validators;

    let mut risk_rows = collect_rows(&state.risk_mask);
    let mut weight_rows = collect_rows(&state.fragmentation_weights);
    let mut stake_rows = collect_rows(&state.stake_matrix);
    let mut liveness_rows = collect_rows(&state.liveness);

    let mut insert_chain = |idx: usize,
                            participation: f64,
                            risk_rows: &mut Vec<Vec<f64>>,
                            weight_rows: &mut Vec<Vec<f64>>,
                            stake_rows: &mut Vec<Vec<f64>>,
                            liveness_rows: &mut Vec<Vec<f64>>,
                            rng: &mut StdRng| {
        let risk_row = stochastic::sample_risk_row(
            participation,
            validators,
            params.min_validators_per_chain,
            rng,
        );
        let weights = match params.staking_mode {
            StakingMode::SingleStaking => stochastic::sample_poisson_row(5.0, validators, rng),
            StakingMode::MultiStaking => vec![0.0; validators],
        };
        // restaking chains recruit full-scale stake on arrival; fragmentation
        // rows are rebuilt from the weights below
        let stake_row = match params.staking_mode {
            StakingMode::MultiStaking => risk_row
                .iter()
                .zip(state.staked_per_validator.iter())
                .map(|(mask, total)| mask * total)
                .collect(),
            StakingMode::SingleStaking => vec![0.0; validators],
        };
        risk_rows.insert(idx, risk_row);
        weight_rows.insert(idx, weights);
        stake_rows.insert(idx, stake_row);
        // new chains start fully live until the next liveness check
        liveness_rows.insert(idx, vec![1.0; validators]);
        state.checkpoint_cadence.insert(idx, stochastic::sample_cadence(1, rng)[0]);
    };

    for _ in 0..new_public {
        insert_chain(
            state.public_chains,
            1.0,
            &mut risk_rows,
            &mut weight_rows,
            &mut stake_rows,
            &mut liveness_rows,
            rng,
        );
        state.public_chains += 1;
    }
    for _ in 0..new_private {
        let idx = state.public_chains + state.private_chains;
        insert_chain(
            idx,
            params.private_participation_prob,
            &mut risk_rows,
            &mut weight_rows,
            &mut stake_rows,
            &mut liveness_rows,
            rng,
        );
        state.private_chains += 1;
    }

    state.risk_mask = Matrix::from_rows(risk_rows);
    state.fragmentation_weights = Matrix::from_rows(weight_rows);
    state.stake_matrix = Matrix::from_rows(stake_rows);
    state.liveness = Matrix::from_rows(liveness_rows);

    if params.staking_mode == StakingMode::SingleStaking {
        state.stake_matrix =
            reallocate_fragmentation(&state.fragmentation_weights, &state.staked_per_validator);
    }
    apply_exposure_floor(&mut state.stake_matrix);
}

fn collect_rows(m: &Matrix) -> Vec<Vec<f64>> {
    m.row_iter().map(|r| r.to_vec()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ParameterSweep, Process, Sweep};
    use crate::state::initial_state;
    use rand::SeedableRng;

    #[test]
    fn test_fragmentation_zero_weight_column_gives_zero_exposure() {
        let weights = Matrix::from_rows(vec![vec![0.0, 3.0], vec![0.0, 1.0]]);
        let exposure = reallocate_fragmentation(&weights, &[1000.0, 4000.0]);
        assert_eq!(exposure.col_sum(0), 0.0);
        assert!((exposure.get(0, 1) - 3000.0).abs() < 1e-9);
        assert!((exposure.get(1, 1) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_fragmentation_partitions_each_validator() {
        let weights = Matrix::from_rows(vec![vec![2.0, 5.0, 1.0], vec![8.0, 5.0, 0.0]]);
        let totals = [1e6, 2e6, 3e6];
        let exposure = reallocate_fragmentation(&weights, &totals);
        for (v, &total) in totals.iter().enumerate() {
            assert!((exposure.col_sum(v) - total).abs() < 1e-6);
        }
    }

    #[test]
    fn test_arrivals_extend_all_per_chain_state() {
        let mut sweep = ParameterSweep::default();
        sweep.adoption_speed_process = Sweep::fixed(Process::Constant(2.0));
        sweep.adoption_speed_public_process = Sweep::fixed(Process::Constant(1.0));
        let params = sweep.subsets().unwrap().remove(0);

        let mut rng = StdRng::seed_from_u64(11);
        let stake = vec![1_000_000.0; 30];
        let mut state = initial_state(&params, &stake, &mut rng).unwrap();
        let before = state.total_chains();

        let (new_public, new_private) = chain_arrivals(&params, 0, 1);
        apply_chain_arrivals(&mut state, &params, new_public, new_private, &mut rng);

        assert_eq!(state.total_chains(), before + 3);
        assert_eq!(state.public_chains, 3);
        assert_eq!(state.private_chains, 4);
        assert_eq!(state.stake_matrix.rows(), before + 3);
        assert_eq!(state.risk_mask.rows(), before + 3);
        assert_eq!(state.liveness.rows(), before + 3);
        assert_eq!(state.checkpoint_cadence.len(), before + 3);
        // the inserted public chain recruits everyone
        assert!(state.risk_mask.row(2).iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_arriving_restaking_chains_carry_full_masked_stake() {
        let mut sweep = ParameterSweep::default();
        sweep.adoption_speed_process = Sweep::fixed(Process::Constant(1.0));
        sweep.adoption_speed_public_process = Sweep::fixed(Process::Constant(1.0));
        let params = sweep.subsets().unwrap().remove(0);

        let mut rng = StdRng::seed_from_u64(17);
        let stake = vec![1_000_000.0; 30];
        let mut state = initial_state(&params, &stake, &mut rng).unwrap();

        apply_chain_arrivals(&mut state, &params, 1, 1, &mut rng);

        // inserted public chain (index 2) holds every validator's full stake
        assert_eq!(state.stake_matrix.row(2), &stake[..]);
        // inserted private chain (last index): full stake where recruited,
        // zero elsewhere
        let last = state.total_chains() - 1;
        for v in 0..30 {
            let expected = state.risk_mask.get(last, v) * stake[v];
            assert_eq!(state.stake_matrix.get(last, v), expected);
        }
    }
}
