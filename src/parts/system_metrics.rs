//! Validator operating costs, the online-rewards aggregate, and annualized
//! revenue/profit/yield metrics.

use crate::constants;
use crate::params::ParameterSet;
use crate::state::SimulationState;

/// Validators operated per public chain in the cost model.
const VALIDATORS_PER_PUBLIC_CHAIN: f64 = 100.0;
/// Validators operated per private chain in the cost model.
const VALIDATORS_PER_PRIVATE_CHAIN: f64 = 15.0;

/// Hardware and checkpoint-submission costs for this timestep, in USD.
pub fn update_costs(state: &mut SimulationState, params: &ParameterSet, run: usize, timestep: usize) {
    let operated = VALIDATORS_PER_PUBLIC_CHAIN * state.public_chains as f64
        + VALIDATORS_PER_PRIVATE_CHAIN * state.private_chains as f64;
    state.validator_count_distribution = params
        .validator_environments
        .iter()
        .map(|env| operated * env.percentage_distribution)
        .collect();

    let hardware_epoch = timestep.saturating_sub(1) * params.dt;
    let monthly_cost = params.hardware_cost_process.at(run, hardware_epoch);
    state.hardware_costs = state
        .validator_count_distribution
        .iter()
        .map(|count| count * monthly_cost / constants::EPOCHS_PER_MONTH * params.dt as f64)
        .sum();

    let fee_per_gas = params.checkpoint_fee_process.at(run, timestep * params.dt);
    let submissions: f64 = state
        .checkpoint_cadence
        .iter()
        .map(|cadence| params.dt as f64 / cadence / params.epochs_per_checkpoint)
        .sum();
    state.checkpoint_costs = submissions * params.checkpoint_gas_cost * fee_per_gas
        / constants::GWEI
        * params.settlement_token_price;

    state.total_network_costs = state.hardware_costs + state.checkpoint_costs;
}

/// Total rewards flowing to online validators: inflation plus fees, token units.
pub fn update_online_rewards(state: &mut SimulationState) {
    state.total_online_rewards = state.total_inflation_to_validators + state.total_txn_fees;
}

/// Revenue, profit, and annualized yields, each relative to the USD value
/// of staked tokens. A zero staked value leaves every yield at 0.
pub fn update_yields(state: &mut SimulationState, params: &ParameterSet) {
    state.total_revenue = state.total_online_rewards * state.price;
    state.total_profit = state.total_revenue - state.total_network_costs;

    let annualize = constants::EPOCHS_PER_YEAR / params.dt as f64;
    let staked_value = state.staked_total * state.price;
    let yield_of = |amount_usd: f64, base: f64| {
        if base > 0.0 {
            amount_usd / base * annualize
        } else {
            0.0
        }
    };

    state.total_revenue_yields = yield_of(state.total_revenue, staked_value);
    state.total_profit_yields = yield_of(state.total_profit, staked_value);
    state.hardware_costs_yields = yield_of(state.hardware_costs, staked_value);
    state.checkpoint_costs_yields = yield_of(state.checkpoint_costs, staked_value);
    state.txn_fee_yields = yield_of(state.total_txn_fees_usd, staked_value);
    state.inflation_yields = yield_of(state.total_inflation_to_validators_usd, staked_value);

    // normal / deviate yields relative to the stake held by each group
    let staked_deviate: f64 = state
        .deviate_mask
        .iter()
        .enumerate()
        .filter(|(_, &d)| d)
        .map(|(v, _)| state.staked_per_validator[v])
        .sum();
    let staked_normal = state.staked_total - staked_deviate;
    state.inflation_normal_yields =
        yield_of(state.total_inflation_normal_usd, staked_normal * state.price);
    state.inflation_deviate_yields =
        yield_of(state.total_inflation_deviate_usd, staked_deviate * state.price);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterSweep;
    use crate::state::initial_state;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn default_state() -> (SimulationState, ParameterSet) {
        let params = ParameterSweep::default().subsets().unwrap().remove(0);
        let mut rng = StdRng::seed_from_u64(6);
        let state = initial_state(&params, &vec![1e7; 10], &mut rng).unwrap();
        (state, params)
    }

    #[test]
    fn test_hardware_costs_follow_environment_distribution() {
        let (mut state, params) = default_state();
        update_costs(&mut state, &params, 0, 1);
        // 2 public + 2 private chains -> 230 operated validators, one env
        assert_eq!(state.validator_count_distribution, vec![230.0]);
        let expected = 230.0 * 500.0 / constants::EPOCHS_PER_MONTH * params.dt as f64;
        assert!((state.hardware_costs - expected).abs() < 1e-9);
        assert!(state.checkpoint_costs > 0.0);
        assert!(
            (state.total_network_costs - state.hardware_costs - state.checkpoint_costs).abs()
                < 1e-9
        );
    }

    #[test]
    fn test_checkpoint_costs_scale_with_cadence() {
        let (mut state, params) = default_state();
        state.checkpoint_cadence = vec![1.0; state.total_chains()];
        update_costs(&mut state, &params, 0, 1);
        let fast = state.checkpoint_costs;

        state.checkpoint_cadence = vec![2.0; state.total_chains()];
        update_costs(&mut state, &params, 0, 1);
        assert!((state.checkpoint_costs - fast / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_yields_annualize_revenue() {
        let (mut state, params) = default_state();
        state.total_inflation_to_validators = 2000.0;
        state.total_txn_fees = 500.0;
        update_online_rewards(&mut state);
        assert_eq!(state.total_online_rewards, 2500.0);

        state.total_network_costs = 400.0;
        update_yields(&mut state, &params);
        assert_eq!(state.total_revenue, 2500.0);
        assert_eq!(state.total_profit, 2100.0);
        let annualize = constants::EPOCHS_PER_YEAR / params.dt as f64;
        let expected = 2500.0 / state.staked_total * annualize;
        assert!((state.total_revenue_yields - expected).abs() < 1e-12);
    }

    #[test]
    fn test_zero_stake_yields_are_zero() {
        let (mut state, params) = default_state();
        state.staked_total = 0.0;
        update_yields(&mut state, &params);
        assert_eq!(state.total_revenue_yields, 0.0);
        assert_eq!(state.inflation_normal_yields, 0.0);
        assert_eq!(state.inflation_deviate_yields, 0.0);
    }
}
