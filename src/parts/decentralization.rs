//! Centralization metrics: per-chain coalition attack sets, Gini and HHI
//! concentration indices, and the cross-chain monopoly share of validators
//! able to attack several chains at once.

use crate::params::ParameterSet;
use crate::state::SimulationState;
use crate::types::StakingMode;

/// Validators (by index) forming the smallest coalition whose combined
/// stake exceeds `threshold` of the chain's total.
///
/// Stakes are ranked descending with ties broken by original index, and
/// accumulated greedily; the validator whose stake crosses the threshold is
/// included. A zero-stake chain has no attack set.
pub fn attack_set(stakes: &[f64], threshold: f64) -> Vec<usize> {
    let total: f64 = stakes.iter().sum();
    if total <= 0.0 {
        return Vec::new();
    }
    let mut order: Vec<usize> = (0..stakes.len()).collect();
    order.sort_by(|&a, &b| {
        stakes[b]
            .partial_cmp(&stakes[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    let mut coalition = Vec::new();
    let mut accumulated = 0.0;
    for index in order {
        accumulated += stakes[index];
        coalition.push(index);
        if accumulated > threshold * total {
            break;
        }
    }
    coalition
}

/// Gini coefficient of a stake distribution, 0 for perfect equality and
/// `1 - 1/n` for a single-validator monopoly. Zero-total input gives 0.
pub fn gini(stakes: &[f64]) -> f64 {
    let n = stakes.len();
    let total: f64 = stakes.iter().sum();
    if n == 0 || total <= 0.0 {
        return 0.0;
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        stakes[b]
            .partial_cmp(&stakes[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    // rank 0 = largest stake
    let weighted: f64 = order
        .iter()
        .enumerate()
        .map(|(rank, &index)| rank as f64 * stakes[index])
        .sum();
    1.0 - (2.0 * weighted + total) / (n as f64 * total)
}

/// Herfindahl-Hirschman index on a 0..10_000 scale. Zero-total input gives 0.
pub fn hhi(stakes: &[f64]) -> f64 {
    let total: f64 = stakes.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    stakes
        .iter()
        .map(|&s| {
            let share = s / total;
            share * share
        })
        .sum::<f64>()
        * 10_000.0
}

/// Recomputes attack sets, per-validator attack-set membership counts, and
/// the averaged Gini/HHI indices over all chains.
pub fn update_centralization(state: &mut SimulationState, params: &ParameterSet) {
    let chains = state.total_chains();
    let validators = state.num_validators;

    let mut membership_51 = vec![0usize; validators];
    let mut membership_33 = vec![0usize; validators];
    let mut nodes_51 = Vec::with_capacity(chains);
    let mut nodes_33 = Vec::with_capacity(chains);
    let mut gini_sum = 0.0;
    let mut hhi_sum = 0.0;

    for chain in 0..chains {
        let stakes = state.stake_matrix.row(chain);
        let set_51 = attack_set(stakes, 0.51);
        let set_33 = attack_set(stakes, 0.33);
        for &v in &set_51 {
            membership_51[v] += 1;
        }
        for &v in &set_33 {
            membership_33[v] += 1;
        }
        nodes_51.push(set_51.len() as u32);
        nodes_33.push(set_33.len() as u32);
        gini_sum += gini(stakes);
        hhi_sum += hhi(stakes);
    }

    state.total_top_51_control = nodes_51.iter().sum();
    state.total_top_33_control = nodes_33.iter().sum();
    state.attack_nodes_51 = nodes_51;
    state.attack_nodes_33 = nodes_33;
    state.avg_gini = if chains > 0 { gini_sum / chains as f64 } else { 0.0 };
    state.avg_hhi = if chains > 0 { hhi_sum / chains as f64 } else { 0.0 };

    state.multi_chain_attackers_51 = membership_51
        .iter()
        .map(|&count| count >= params.min_attack_chains)
        .collect();
    state.multi_chain_attackers_33 = membership_33
        .iter()
        .map(|&count| count >= params.min_attack_chains)
        .collect();
    state.num_multi_chain_attackers_51 =
        state.multi_chain_attackers_51.iter().filter(|&&f| f).count();
    state.num_multi_chain_attackers_33 =
        state.multi_chain_attackers_33.iter().filter(|&&f| f).count();
}

/// Total stake share held, across every chain, by validators flagged as
/// multi-chain attackers.
pub fn update_monopoly(state: &mut SimulationState) {
    let system_total = state.stake_matrix.sum();
    if system_total <= 0.0 {
        state.monopoly_51 = 0.0;
        state.monopoly_33 = 0.0;
        return;
    }
    let stake_of = |flags: &[bool]| -> f64 {
        flags
            .iter()
            .enumerate()
            .filter(|(_, &flagged)| flagged)
            .map(|(v, _)| state.stake_matrix.col_sum(v))
            .sum()
    };
    state.monopoly_51 = stake_of(&state.multi_chain_attackers_51) / system_total;
    state.monopoly_33 = stake_of(&state.multi_chain_attackers_33) / system_total;
}

/// Total stake lost if every large service were slashed simultaneously.
/// Large services are the fully-recruiting chains, i.e. the public block.
///
/// Restaking: the slashing fraction applies to a validator's summed exposure
/// across the large services, capped at its total stake (the same collateral
/// cannot be burned twice). Fragmentation: the partitions allocated to the
/// large services are lost whole.
pub fn update_slashable_amount(state: &mut SimulationState, params: &ParameterSet) {
    state.slashable_stake_large_service = match params.staking_mode {
        StakingMode::MultiStaking => (0..state.num_validators)
            .map(|v| {
                let exposed: f64 = (0..state.public_chains)
                    .map(|chain| state.stake_matrix.get(chain, v))
                    .sum();
                (exposed * params.slashing_fraction).min(state.staked_per_validator[v])
            })
            .sum(),
        StakingMode::SingleStaking => (0..state.public_chains)
            .map(|chain| state.stake_matrix.row(chain).iter().sum::<f64>())
            .sum(),
    };
}
