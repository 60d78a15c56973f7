//! Reward functions.
//!
//! A reward function is a deterministic function of the observation, the
//! applied setpoints and the simulated date. It is bound to the bridge's
//! observation schema at construction, so a missing variable is reported
//! before the first episode starts.

use crate::calendar::{in_season, SimDate};
use hvacgym_env::{EnvError, ObservationSchema, RewardTerm};
use serde::{Deserialize, Serialize};

/// Name of the energy component.
pub const REWARD_ENERGY_TERM: &str = "reward_energy";

/// Name of the comfort component.
pub const REWARD_COMFORT_TERM: &str = "reward_comfort";

/// Everything a reward function may look at.
#[derive(Debug, Clone, Copy)]
pub struct RewardContext<'a> {
    /// Raw bridge observation (calendar fields included)
    pub observation: &'a [f64],

    /// Setpoints applied this step
    pub setpoints: &'a [f64],

    pub date: SimDate,
}

/// Reward value plus the quantities it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardBreakdown {
    pub reward: f64,
    pub terms: Vec<RewardTerm>,
    pub total_power: f64,
    pub abs_comfort: f64,
}

/// A pluggable reward.
pub trait RewardFunction: Send {
    /// Names of the components returned in `RewardBreakdown::terms`.
    fn term_names(&self) -> &[String];

    fn compute(&self, ctx: &RewardContext<'_>) -> RewardBreakdown;
}

/// Shared parameters of the comfort/energy trade-off rewards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardParams {
    /// Zone temperatures checked against the comfort range
    pub temperature_variables: Vec<String>,

    /// Electric demand (W)
    pub energy_variable: String,

    /// Weight of the energy term, in [0, 1]
    #[serde(default = "default_energy_weight")]
    pub energy_weight: f64,

    #[serde(default = "default_lambda_energy")]
    pub lambda_energy: f64,

    #[serde(default = "default_lambda_temperature")]
    pub lambda_temperature: f64,

    /// Comfort range outside the summer window (°C)
    #[serde(default = "default_range_winter")]
    pub range_comfort_winter: (f64, f64),

    /// Comfort range inside the summer window (°C)
    #[serde(default = "default_range_summer")]
    pub range_comfort_summer: (f64, f64),

    /// First (month, day) of summer
    #[serde(default = "default_summer_start")]
    pub summer_start: (u32, u32),

    /// Last (month, day) of summer
    #[serde(default = "default_summer_final")]
    pub summer_final: (u32, u32),
}

fn default_energy_weight() -> f64 {
    0.5
}

fn default_lambda_energy() -> f64 {
    1e-4
}

fn default_lambda_temperature() -> f64 {
    1.0
}

fn default_range_winter() -> (f64, f64) {
    (20.0, 23.5)
}

fn default_range_summer() -> (f64, f64) {
    (23.0, 26.0)
}

fn default_summer_start() -> (u32, u32) {
    (6, 1)
}

fn default_summer_final() -> (u32, u32) {
    (9, 30)
}

impl RewardParams {
    /// Parameters with default weights for the given variables.
    pub fn new(temperature_variables: Vec<String>, energy_variable: String) -> Self {
        Self {
            temperature_variables,
            energy_variable,
            energy_weight: default_energy_weight(),
            lambda_energy: default_lambda_energy(),
            lambda_temperature: default_lambda_temperature(),
            range_comfort_winter: default_range_winter(),
            range_comfort_summer: default_range_summer(),
            summer_start: default_summer_start(),
            summer_final: default_summer_final(),
        }
    }

    fn validate(&self) -> Result<(), EnvError> {
        if !(0.0..=1.0).contains(&self.energy_weight) {
            return Err(EnvError::configuration(format!(
                "energy_weight must be in [0, 1], got {}",
                self.energy_weight
            )));
        }
        for (name, lambda) in [
            ("lambda_energy", self.lambda_energy),
            ("lambda_temperature", self.lambda_temperature),
        ] {
            if !lambda.is_finite() || lambda < 0.0 {
                return Err(EnvError::configuration(format!(
                    "{} must be a non-negative number, got {}",
                    name, lambda
                )));
            }
        }
        for (name, (lo, hi)) in [
            ("range_comfort_winter", self.range_comfort_winter),
            ("range_comfort_summer", self.range_comfort_summer),
        ] {
            if lo > hi {
                return Err(EnvError::configuration(format!(
                    "{} is inverted: ({}, {})",
                    name, lo, hi
                )));
            }
        }
        if self.temperature_variables.is_empty() {
            return Err(EnvError::configuration("reward needs at least one temperature variable"));
        }
        Ok(())
    }

    fn comfort_range(&self, date: &SimDate) -> (f64, f64) {
        if in_season(date.month, date.day, self.summer_start, self.summer_final) {
            self.range_comfort_summer
        } else {
            self.range_comfort_winter
        }
    }
}

/// Variable positions resolved against the bridge schema.
#[derive(Debug, Clone)]
struct Bound {
    params: RewardParams,
    temperature_index: Vec<usize>,
    energy_index: usize,
    terms: Vec<String>,
}

impl Bound {
    fn new(params: RewardParams, schema: &ObservationSchema, who: &str) -> Result<Self, EnvError> {
        params.validate()?;
        let temperature_index = params
            .temperature_variables
            .iter()
            .map(|name| schema.require(name, who))
            .collect::<Result<Vec<_>, _>>()?;
        let energy_index = schema.require(&params.energy_variable, who)?;

        Ok(Self {
            params,
            temperature_index,
            energy_index,
            terms: vec![REWARD_ENERGY_TERM.to_string(), REWARD_COMFORT_TERM.to_string()],
        })
    }

    /// Per-variable distance (°C) outside the comfort range.
    fn deviations<'a>(&'a self, ctx: &'a RewardContext<'_>) -> impl Iterator<Item = f64> + 'a {
        let (lo, hi) = self.params.comfort_range(&ctx.date);
        self.temperature_index.iter().map(move |&i| {
            let t = ctx.observation[i];
            if t < lo {
                lo - t
            } else if t > hi {
                t - hi
            } else {
                0.0
            }
        })
    }

    fn combine(&self, power: f64, comfort: f64, abs_comfort: f64) -> RewardBreakdown {
        let p = &self.params;
        let reward_energy = -p.lambda_energy * power;
        let reward_comfort = -p.lambda_temperature * comfort;
        let reward = p.energy_weight * reward_energy + (1.0 - p.energy_weight) * reward_comfort;

        RewardBreakdown {
            reward,
            terms: vec![
                RewardTerm::new(REWARD_ENERGY_TERM, reward_energy),
                RewardTerm::new(REWARD_COMFORT_TERM, reward_comfort),
            ],
            total_power: power,
            abs_comfort,
        }
    }
}

/// `-W·λ_E·power - (1-W)·λ_T·Σ deviation`.
#[derive(Debug, Clone)]
pub struct LinearReward {
    bound: Bound,
}

impl LinearReward {
    pub fn new(params: RewardParams, schema: &ObservationSchema) -> Result<Self, EnvError> {
        Ok(Self {
            bound: Bound::new(params, schema, "LinearReward")?,
        })
    }
}

impl RewardFunction for LinearReward {
    fn term_names(&self) -> &[String] {
        &self.bound.terms
    }

    fn compute(&self, ctx: &RewardContext<'_>) -> RewardBreakdown {
        let power = ctx.observation[self.bound.energy_index];
        let comfort: f64 = self.bound.deviations(ctx).sum();
        self.bound.combine(power, comfort, comfort)
    }
}

/// Like [`LinearReward`], with each deviation `d` penalised as `exp(d) - 1`.
#[derive(Debug, Clone)]
pub struct ExpReward {
    bound: Bound,
}

impl ExpReward {
    pub fn new(params: RewardParams, schema: &ObservationSchema) -> Result<Self, EnvError> {
        Ok(Self {
            bound: Bound::new(params, schema, "ExpReward")?,
        })
    }
}

impl RewardFunction for ExpReward {
    fn term_names(&self) -> &[String] {
        &self.bound.terms
    }

    fn compute(&self, ctx: &RewardContext<'_>) -> RewardBreakdown {
        let power = ctx.observation[self.bound.energy_index];
        let (comfort, abs_comfort) = self
            .bound
            .deviations(ctx)
            .fold((0.0, 0.0), |(penalty, abs), d| (penalty + d.exp_m1(), abs + d));
        self.bound.combine(power, comfort, abs_comfort)
    }
}

/// Reward selection in a pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RewardConfig {
    Linear(RewardParams),
    Exponential(RewardParams),
}

impl RewardConfig {
    /// Linear reward with default weights.
    pub fn linear(temperature_variables: Vec<String>, energy_variable: String) -> Self {
        RewardConfig::Linear(RewardParams::new(temperature_variables, energy_variable))
    }

    /// Binds the reward to the bridge schema.
    pub fn build(&self, schema: &ObservationSchema) -> Result<Box<dyn RewardFunction>, EnvError> {
        Ok(match self {
            RewardConfig::Linear(params) => Box::new(LinearReward::new(params.clone(), schema)?),
            RewardConfig::Exponential(params) => Box::new(ExpReward::new(params.clone(), schema)?),
        })
    }
}
