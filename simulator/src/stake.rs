//! Initial per-validator stake generation.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Poisson};

/// Splits the staked share of the supply across validators with
/// Poisson(5)-proportional weights, so a few validators start noticeably
/// larger than the rest. Deterministic in the seed.
pub fn generate_initial_stake(num_validators: usize, total_stake: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let dist = Poisson::new(5.0).expect("lambda must be positive");
    let mut weights: Vec<f64> = (0..num_validators).map(|_| dist.sample(&mut rng)).collect();
    let mut weight_sum: f64 = weights.iter().sum();
    if weight_sum == 0.0 {
        // all-zero draw: fall back to an equal split
        weights = vec![1.0; num_validators];
        weight_sum = num_validators as f64;
    }
    weights
        .into_iter()
        .map(|w| w / weight_sum * total_stake)
        .collect()
}
