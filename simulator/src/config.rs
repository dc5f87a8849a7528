//! Configuration loader and validator for the Hub simulator.
//! Handles parsing, validation, and access to scenario configuration files.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::fs;
use thiserror::Error;

use hubsim::params::{ParameterSweep, Process, Sweep};
use hubsim::stochastic;
use hubsim::types::StakingMode;
use hubsim::RunPlan;

// ------------------------------------------------------------------------------------------------
// Main Configuration Structs
// ------------------------------------------------------------------------------------------------

/// Main configuration struct for simulation parameters.
///
/// Contains everything needed to run one experiment: run shape, network
/// topology, economic parameters, the slashing event, and the staking mode.
/// It is also the base configuration that sweep scenarios modify per value.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Run shape: timesteps, Monte Carlo repetitions, seed, timescale
    pub simulation: SimulationConfig,
    /// Network topology: validators and initial/arriving chains
    pub network: NetworkConfig,
    /// Token economics: supply, issuance, prices, costs
    pub economics: EconomicsConfig,
    /// The large-service slashing event
    pub slashing: SlashingConfig,
    /// Stake allocation mode
    pub staking: StakingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimulationConfig {
    /// Number of timesteps per run
    pub timesteps: usize,
    /// Monte Carlo repetitions per parameter subset
    pub monte_carlo_runs: usize,
    /// Base seed all per-run RNG streams derive from
    pub base_seed: u64,
    /// Epochs per timestep
    pub dt: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    /// Number of validators in the set
    pub num_validators: usize,
    /// Public chains at the start of each run
    pub public_chains: usize,
    /// Private chains at the start of each run
    pub private_chains: usize,
    /// New private chains arriving per timestep
    pub new_private_chains_per_timestep: f64,
    /// New public chains arriving per timestep
    pub new_public_chains_per_timestep: f64,
    /// Adoption curve: "constant" (default) or "quadratic"
    #[serde(default)]
    pub adoption_curve: Option<String>,
    /// Private chains existing at the end of the horizon, for the quadratic curve
    #[serde(default)]
    pub final_private_chains: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EconomicsConfig {
    /// Token supply at t = 0
    pub initial_supply: f64,
    /// Fraction of the supply staked at t = 0
    pub staking_ratio: f64,
    /// Constant annual issuance rate
    pub inflationary_rate_per_year: f64,
    /// Coefficient of the sqrt issuance curve; 0 keeps the constant rate
    pub inflation_sqrt_numerator: f64,
    /// Token spot price in USD
    pub token_price: f64,
    /// Hardware cost per operated validator per month, USD
    pub hardware_cost_per_month: f64,
    /// Checkpoint submission fee, gwei per gas
    pub checkpoint_fee_gwei: f64,
    /// Spot price of the settlement token paying for checkpoint gas, USD
    pub settlement_token_price: f64,
    /// Price process shape: "constant" (default), "convex", or "stochastic"
    #[serde(default)]
    pub price_process: Option<String>,
    /// Peak price for the ramped price processes
    #[serde(default)]
    pub max_token_price: Option<f64>,
    /// Gaussian noise on the stochastic price process
    #[serde(default)]
    pub price_sigma: Option<f64>,
    /// Halve hardware costs every three years when true
    #[serde(default)]
    pub hardware_cost_decay: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SlashingConfig {
    /// Start date of each run, `YYYY-MM-DD`
    pub date_start: String,
    /// Date the slashing event fires, `YYYY-MM-DD`
    pub date_slashing: String,
    /// Fraction of target-chain exposure slashed
    pub slashing_fraction: f64,
    /// Chains eligible as the slashing target
    pub slashed_chain_candidates: Vec<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StakingConfig {
    /// "MultiStaking" (restaking) or "SingleStaking" (fragmentation)
    pub mode: String,
}

// ------------------------------------------------------------------------------------------------
// Sweep Configuration Structs
// ------------------------------------------------------------------------------------------------

/// Configuration for sweep scenarios: the base configuration plus the
/// `[sweep]` section describing which values to run.
#[derive(Debug, Deserialize, Clone)]
pub struct SweepConfig {
    pub sweep: SweepParameters,
    pub simulation: SimulationConfig,
    pub network: NetworkConfig,
    pub economics: EconomicsConfig,
    pub slashing: SlashingConfig,
    pub staking: StakingConfig,
}

/// Parameters of one sweep. Only the step/list matching the scenario's
/// swept parameter should be set.
#[derive(Debug, Deserialize, Clone)]
pub struct SweepParameters {
    /// Number of simulations in the sweep
    pub num_simulations: usize,
    /// Step size for slashing fraction sweeps
    #[serde(default)]
    pub slashing_fraction_step: Option<f64>,
    /// Staking modes to compare, for staking mode sweeps
    #[serde(default)]
    pub staking_modes: Option<Vec<String>>,
}

impl SweepConfig {
    /// The base configuration the sweep modifies per parameter value.
    pub fn base(&self) -> Config {
        Config {
            simulation: self.simulation.clone(),
            network: self.network.clone(),
            economics: self.economics.clone(),
            slashing: self.slashing.clone(),
            staking: self.staking.clone(),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Error Types and Validation
// ------------------------------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileReadError(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

fn validate_common_fields(config: &Config) -> Result<(), ConfigError> {
    if config.simulation.timesteps == 0 {
        return Err(ConfigError::ValidationError("Timesteps must be positive".into()));
    }
    if config.simulation.monte_carlo_runs == 0 {
        return Err(ConfigError::ValidationError("Monte Carlo runs must be positive".into()));
    }
    if config.simulation.dt == 0 {
        return Err(ConfigError::ValidationError("dt must be positive".into()));
    }
    if config.network.num_validators == 0 {
        return Err(ConfigError::ValidationError("Number of validators must be positive".into()));
    }
    if config.network.public_chains + config.network.private_chains == 0 {
        return Err(ConfigError::ValidationError("At least one initial chain is required".into()));
    }
    if config.economics.initial_supply <= 0.0 {
        return Err(ConfigError::ValidationError("Initial supply must be positive".into()));
    }
    if config.economics.staking_ratio <= 0.0 || config.economics.staking_ratio > 1.0 {
        return Err(ConfigError::ValidationError("Staking ratio must be in (0, 1]".into()));
    }
    if config.economics.token_price <= 0.0 {
        return Err(ConfigError::ValidationError("Token price must be positive".into()));
    }
    if config.slashing.slashing_fraction < 0.0 || config.slashing.slashing_fraction > 1.0 {
        return Err(ConfigError::ValidationError("Slashing fraction must be between 0 and 1".into()));
    }
    if config.slashing.slashed_chain_candidates.is_empty() {
        return Err(ConfigError::ValidationError("Slashing needs at least one candidate chain".into()));
    }
    if StakingMode::parse(&config.staking.mode).is_none() {
        return Err(ConfigError::ValidationError(format!(
            "Unknown staking mode '{}': expected MultiStaking or SingleStaking",
            config.staking.mode
        )));
    }
    parse_date(&config.slashing.date_start)?;
    parse_date(&config.slashing.date_slashing)?;
    Ok(())
}

fn parse_date(s: &str) -> Result<DateTime<Utc>, ConfigError> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| ConfigError::ValidationError(format!("Invalid date '{}': {}", s, e)))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ConfigError::ValidationError(format!("Invalid date '{}'", s)))?;
    Ok(DateTime::from_naive_utc_and_offset(midnight, Utc))
}

// ------------------------------------------------------------------------------------------------
// Configuration Implementation Methods
// ------------------------------------------------------------------------------------------------

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("simulator/src/scenarios/config_baseline.toml")
    }

    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let config_str = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&config_str)?;
        validate_common_fields(&config)?;
        Ok(config)
    }

    /// Builds the core-library parameter sweep for this configuration.
    /// Every sweepable parameter is fixed; sweep scenarios modify the
    /// config per value instead of using multi-valued lists.
    pub fn to_parameter_sweep(&self) -> Result<ParameterSweep, ConfigError> {
        let mode = StakingMode::parse(&self.staking.mode).ok_or_else(|| {
            ConfigError::ValidationError(format!("Unknown staking mode '{}'", self.staking.mode))
        })?;

        let mut sweep = ParameterSweep::default();
        sweep.dt = Sweep::fixed(self.simulation.dt);
        sweep.date_start = Sweep::fixed(parse_date(&self.slashing.date_start)?);
        sweep.date_slashing = Sweep::fixed(parse_date(&self.slashing.date_slashing)?);
        sweep.staking_mode = Sweep::fixed(mode);
        sweep.public_chains = Sweep::fixed(self.network.public_chains);
        sweep.private_chains = Sweep::fixed(self.network.private_chains);
        sweep.inflationary_rate_per_year = Sweep::fixed(self.economics.inflationary_rate_per_year);
        sweep.inflation_sqrt_numerator = Sweep::fixed(self.economics.inflation_sqrt_numerator);
        sweep.slashing_fraction = Sweep::fixed(self.slashing.slashing_fraction);
        sweep.slashed_chain_candidates = self.slashing.slashed_chain_candidates.clone();
        sweep.initial_supply = self.economics.initial_supply;
        sweep.settlement_token_price = self.economics.settlement_token_price;
        sweep.price_process = Sweep::fixed(self.build_price_process()?);
        sweep.adoption_speed_process = Sweep::fixed(self.build_adoption_process()?);
        sweep.adoption_speed_public_process = Sweep::fixed(Process::Constant(
            self.network.new_public_chains_per_timestep,
        ));
        sweep.hardware_cost_process = Sweep::fixed(self.build_hardware_process());
        sweep.checkpoint_fee_process =
            Sweep::fixed(Process::Constant(self.economics.checkpoint_fee_gwei));
        Ok(sweep)
    }

    /// Builds the token price process. The ramped shapes start at the
    /// configured price, peak near `max_token_price`, and average halfway
    /// between the two; "stochastic" adds per-run Gaussian noise.
    fn build_price_process(&self) -> Result<Process, ConfigError> {
        let price = self.economics.token_price;
        match self.economics.price_process.as_deref().unwrap_or("constant") {
            "constant" => Ok(Process::Constant(price)),
            shape @ ("convex" | "stochastic") => {
                let max = self.economics.max_token_price.ok_or_else(|| {
                    ConfigError::ValidationError(format!(
                        "Price process '{}' requires max_token_price",
                        shape
                    ))
                })?;
                if max <= price {
                    return Err(ConfigError::ValidationError(
                        "max_token_price must exceed token_price".into(),
                    ));
                }
                let target_avg = (price + max) / 2.0;
                if shape == "convex" {
                    Ok(Process::samples(vec![stochastic::convex_price_samples(
                        self.simulation.timesteps,
                        self.simulation.dt,
                        price,
                        max,
                        target_avg,
                    )]))
                } else {
                    let sigma = self.economics.price_sigma.unwrap_or((max - price) / 20.0);
                    Ok(stochastic::per_run_samples(
                        self.simulation.monte_carlo_runs,
                        self.simulation.base_seed,
                        |rng| {
                            stochastic::stochastic_price_samples(
                                self.simulation.timesteps,
                                self.simulation.dt,
                                price,
                                max,
                                target_avg,
                                sigma,
                                rng,
                            )
                        },
                    ))
                }
            }
            other => Err(ConfigError::ValidationError(format!(
                "Unknown price process '{}': expected constant, convex, or stochastic",
                other
            ))),
        }
    }

    fn build_adoption_process(&self) -> Result<Process, ConfigError> {
        match self.network.adoption_curve.as_deref().unwrap_or("constant") {
            "constant" => Ok(Process::Constant(
                self.network.new_private_chains_per_timestep,
            )),
            "quadratic" => {
                let final_chains = self.network.final_private_chains.ok_or_else(|| {
                    ConfigError::ValidationError(
                        "Quadratic adoption requires final_private_chains".into(),
                    )
                })?;
                Ok(Process::samples(vec![stochastic::exp_adoption_samples(
                    self.simulation.timesteps,
                    self.simulation.dt,
                    final_chains,
                )]))
            }
            other => Err(ConfigError::ValidationError(format!(
                "Unknown adoption curve '{}': expected constant or quadratic",
                other
            ))),
        }
    }

    fn build_hardware_process(&self) -> Process {
        if self.economics.hardware_cost_decay.unwrap_or(false) {
            Process::samples(vec![stochastic::moores_law_hardware_samples(
                self.simulation.timesteps,
                self.simulation.dt,
                self.economics.hardware_cost_per_month,
            )])
        } else {
            Process::Constant(self.economics.hardware_cost_per_month)
        }
    }

    pub fn run_plan(&self) -> RunPlan {
        RunPlan {
            timesteps: self.simulation.timesteps,
            monte_carlo_runs: self.simulation.monte_carlo_runs,
            base_seed: self.simulation.base_seed,
        }
    }

    /// Total tokens staked at t = 0.
    pub fn total_initial_stake(&self) -> f64 {
        self.economics.initial_supply * self.economics.staking_ratio
    }
}

impl SweepConfig {
    pub fn load_sweep_slashing_fraction() -> Result<Self, ConfigError> {
        let config = Self::load_from("simulator/src/scenarios/config_sweep_slashing_fraction.toml")?;
        if config.sweep.slashing_fraction_step.is_none() {
            return Err(ConfigError::ValidationError(
                "Slashing fraction sweep requires slashing_fraction_step".into(),
            ));
        }
        Ok(config)
    }

    pub fn load_sweep_staking_mode() -> Result<Self, ConfigError> {
        let config = Self::load_from("simulator/src/scenarios/config_sweep_staking_mode.toml")?;
        match &config.sweep.staking_modes {
            Some(modes) if !modes.is_empty() => {
                for mode in modes {
                    if StakingMode::parse(mode).is_none() {
                        return Err(ConfigError::ValidationError(format!(
                            "Unknown staking mode '{}' in sweep list",
                            mode
                        )));
                    }
                }
                Ok(config)
            }
            _ => Err(ConfigError::ValidationError(
                "Staking mode sweep requires a non-empty staking_modes list".into(),
            )),
        }
    }

    fn load_from(path: &str) -> Result<Self, ConfigError> {
        let config_str = fs::read_to_string(path)?;
        let config: SweepConfig = toml::from_str(&config_str)?;
        if config.sweep.num_simulations == 0 {
            return Err(ConfigError::ValidationError(
                "Number of simulations must be positive".into(),
            ));
        }
        validate_common_fields(&config.base())?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> Config {
        toml::from_str(
            r#"
            [simulation]
            timesteps = 20
            monte_carlo_runs = 2
            base_seed = 42
            dt = 225

            [network]
            num_validators = 100
            public_chains = 2
            private_chains = 2
            new_private_chains_per_timestep = 1.0
            new_public_chains_per_timestep = 0.0

            [economics]
            initial_supply = 10000000000.0
            staking_ratio = 0.3
            inflationary_rate_per_year = 0.01
            inflation_sqrt_numerator = 0.0
            token_price = 1.0
            hardware_cost_per_month = 500.0
            checkpoint_fee_gwei = 12.0
            settlement_token_price = 1500.0

            [slashing]
            date_start = "2023-06-01"
            date_slashing = "2023-06-11"
            slashing_fraction = 0.1
            slashed_chain_candidates = [0, 1, 2]

            [staking]
            mode = "MultiStaking"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_config_builds_a_sweep() {
        let config = sample_config();
        assert!(validate_common_fields(&config).is_ok());
        let sweep = config.to_parameter_sweep().unwrap();
        let subsets = sweep.subsets().unwrap();
        assert_eq!(subsets.len(), 1);
        assert_eq!(subsets[0].dt, 225);
        assert_eq!(subsets[0].public_chains, 2);
    }

    #[test]
    fn test_ramped_price_process_requires_a_peak() {
        let mut config = sample_config();
        config.economics.price_process = Some("stochastic".into());
        assert!(config.to_parameter_sweep().is_err());

        config.economics.max_token_price = Some(2.0);
        assert!(config.to_parameter_sweep().is_ok());
    }

    #[test]
    fn test_quadratic_adoption_requires_final_chain_count() {
        let mut config = sample_config();
        config.network.adoption_curve = Some("quadratic".into());
        assert!(config.to_parameter_sweep().is_err());

        config.network.final_private_chains = Some(50);
        assert!(config.to_parameter_sweep().is_ok());
    }

    #[test]
    fn test_invalid_staking_mode_is_rejected() {
        let mut config = sample_config();
        config.staking.mode = "TripleStaking".into();
        assert!(matches!(
            validate_common_fields(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_invalid_date_is_rejected() {
        let mut config = sample_config();
        config.slashing.date_slashing = "June 11".into();
        assert!(validate_common_fields(&config).is_err());
    }

    #[test]
    fn test_zero_timesteps_rejected() {
        let mut config = sample_config();
        config.simulation.timesteps = 0;
        assert!(validate_common_fields(&config).is_err());
    }
}
