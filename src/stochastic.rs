//! Pre-generated stochastic process trajectories and sampling helpers.
//!
//! Every trajectory is generated up front from an explicit RNG handle, one
//! trajectory per Monte Carlo run, so a run's inputs are fixed before its
//! scheduler starts and results do not depend on execution order.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Bernoulli, Binomial, Distribution, Normal, Poisson};

use crate::constants;
use crate::matrix::Matrix;
use crate::params::Process;

// ------------------------------------------------------------------------------------------------
// Trajectory generators
// ------------------------------------------------------------------------------------------------

/// Deterministic convex token price ramp from `min_price`, rescaled so the
/// trajectory averages `target_avg`.
pub fn convex_price_samples(
    timesteps: usize,
    dt: usize,
    min_price: f64,
    max_price: f64,
    target_avg: f64,
) -> Vec<f64> {
    let t = timesteps * dt;
    let coeff = (max_price - min_price) / ((t as f64 + 1.0) * (t as f64 + 1.0));
    let mut samples: Vec<f64> = (0..t + 2)
        .map(|i| coeff * (i as f64) * (i as f64) + min_price)
        .collect();
    let current_avg = samples.iter().sum::<f64>() / samples.len() as f64 - min_price;
    if current_avg > 0.0 {
        for s in samples.iter_mut() {
            *s = (*s - min_price) / current_avg * (target_avg - min_price) + min_price;
        }
    }
    samples
}

/// Convex price ramp with Gaussian noise, clipped at `min_price`.
pub fn stochastic_price_samples(
    timesteps: usize,
    dt: usize,
    min_price: f64,
    max_price: f64,
    target_avg: f64,
    sigma: f64,
    rng: &mut StdRng,
) -> Vec<f64> {
    let base = convex_price_samples(timesteps, dt, min_price, max_price, target_avg);
    let noise = Normal::new(0.0, sigma).expect("sigma must be finite and non-negative");
    base.into_iter()
        .map(|s| (s + noise.sample(rng)).max(min_price))
        .collect()
}

/// Quadratic chain adoption schedule: per-epoch counts of newly created
/// chains such that roughly `final_chains` exist after the full horizon.
pub fn exp_adoption_samples(timesteps: usize, dt: usize, final_chains: usize) -> Vec<f64> {
    let t = (timesteps * dt) as f64;
    let coeff = (final_chains.saturating_sub(2)) as f64 / (t * t);
    let cumulative: Vec<i64> = (0..=timesteps)
        .map(|i| (coeff * ((dt * i) as f64) * ((dt * i) as f64)) as i64)
        .collect();
    let mut rates = Vec::with_capacity(timesteps * dt);
    for w in cumulative.windows(2) {
        let per_timestep = (w[1] - w[0]).max(0) as f64;
        // repeated dt times so the schedule is indexable by epoch
        for _ in 0..dt {
            rates.push(per_timestep);
        }
    }
    rates
}

/// Hardware cost trajectory halving every three years (Moore's law).
pub fn moores_law_hardware_samples(timesteps: usize, dt: usize, initial_cost: f64) -> Vec<f64> {
    let t = timesteps * dt;
    let final_year = t as f64 / constants::EPOCHS_PER_YEAR;
    let half_period_years = 3.0;
    (0..t)
        .map(|i| initial_cost / 2f64.powf(i as f64 / t as f64 * final_year / half_period_years))
        .collect()
}

/// Validator uptime samples, uniform in [0.96, 0.99].
pub fn uptime_samples(timesteps: usize, dt: usize, rng: &mut StdRng) -> Vec<f64> {
    (0..timesteps * dt + 1).map(|_| rng.gen_range(0.96..0.99)).collect()
}

/// Builds a [`Process`] holding one trajectory per run, each generated from
/// its own seeded RNG stream.
pub fn per_run_samples<F>(runs: usize, base_seed: u64, mut generate: F) -> Process
where
    F: FnMut(&mut StdRng) -> Vec<f64>,
{
    let trajectories = (0..runs)
        .map(|run| {
            let mut rng = StdRng::seed_from_u64(process_seed(base_seed, run));
            generate(&mut rng)
        })
        .collect();
    Process::samples(trajectories)
}

fn process_seed(base_seed: u64, run: usize) -> u64 {
    base_seed
        .wrapping_add((run as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_mul(0x2545_F491_4F6C_DD1D)
}

// ------------------------------------------------------------------------------------------------
// Matrix sampling
// ------------------------------------------------------------------------------------------------

/// Samples one chain's 0/1 participation row. Each validator participates
/// with probability `participation_prob`; if the draw leaves fewer than
/// `min_validators` participants, the row is re-drawn as exactly
/// `min_validators` uniformly chosen validators.
pub fn sample_risk_row(
    participation_prob: f64,
    num_validators: usize,
    min_validators: usize,
    rng: &mut StdRng,
) -> Vec<f64> {
    let dist = Bernoulli::new(participation_prob.clamp(0.0, 1.0))
        .expect("participation probability in [0, 1]");
    let mut row: Vec<f64> = (0..num_validators)
        .map(|_| if dist.sample(rng) { 1.0 } else { 0.0 })
        .collect();

    let participants = row.iter().filter(|&&v| v != 0.0).count();
    if participants < min_validators.min(num_validators) {
        let mut indices: Vec<usize> = (0..num_validators).collect();
        indices.shuffle(rng);
        row = vec![0.0; num_validators];
        for &i in indices.iter().take(min_validators.min(num_validators)) {
            row[i] = 1.0;
        }
    }
    row
}

/// Poisson(lambda) weight row used by fragmentation-mode allocation.
pub fn sample_poisson_row(lambda: f64, num_validators: usize, rng: &mut StdRng) -> Vec<f64> {
    let dist = Poisson::new(lambda).expect("lambda must be positive");
    (0..num_validators).map(|_| dist.sample(rng)).collect()
}

/// Per-chain checkpoint submission cadence in epochs: `Bernoulli(0.5) + 1`.
pub fn sample_cadence(num_chains: usize, rng: &mut StdRng) -> Vec<f64> {
    let dist = Bernoulli::new(0.5).expect("0.5 is a valid probability");
    (0..num_chains)
        .map(|_| if dist.sample(rng) { 2.0 } else { 1.0 })
        .collect()
}

/// Liveness fraction for one (chain, validator) pair over `dt` epochs:
/// `Binomial(dt, p) / dt`.
pub fn sample_liveness(dt: usize, p: f64, rng: &mut StdRng) -> f64 {
    let dist = Binomial::new(dt as u64, p).expect("probability in [0, 1]");
    dist.sample(rng) as f64 / dt as f64
}

/// Fresh liveness matrix for all chains and validators.
pub fn sample_liveness_matrix(
    chains: usize,
    validators: usize,
    dt: usize,
    p: f64,
    rng: &mut StdRng,
) -> Matrix {
    let rows = (0..chains)
        .map(|_| (0..validators).map(|_| sample_liveness(dt, p, rng)).collect())
        .collect();
    Matrix::from_rows(rows)
}
