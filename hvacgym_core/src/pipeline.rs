//! Configuration-to-pipeline factory.
//!
//! A pipeline is one [`SimulationBridge`] with zero or more wrappers around
//! it. The wrapper list is ordered innermost first and validated before
//! anything is started.

use crate::bridge::SimulationBridge;
use crate::config::EnvConfig;
use crate::reward::RewardConfig;
use crate::wrappers::{
    DatetimeWrapper, DiscreteIncrementalWrapper, LoggerWrapper, MultiObjectiveReward,
    MultiObsWrapper, NormalizeObservation, PreviousObservationWrapper, RangeTable,
};
use hvacgym_env::{Env, EnvError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// One wrapper of the stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WrapperConfig {
    /// Min-max normalization; the 5-zone table when `ranges` is absent
    Normalization {
        #[serde(default)]
        ranges: Option<RangeTable>,
    },

    Datetime,

    PreviousValue { variables: Vec<String> },

    IncrementalSetpoint {
        /// Halfway between the bounds when absent
        #[serde(default)]
        initial_values: Option<Vec<f64>>,

        #[serde(default = "default_delta")]
        delta: f64,

        #[serde(default = "default_step")]
        step: f64,
    },

    MultiObs { n: usize },

    MultiObjective { terms: Vec<String> },

    Logger,
}

fn default_delta() -> f64 {
    2.0
}

fn default_step() -> f64 {
    0.5
}

impl WrapperConfig {
    fn kind(&self) -> &'static str {
        match self {
            WrapperConfig::Normalization { .. } => "normalization",
            WrapperConfig::Datetime => "datetime",
            WrapperConfig::PreviousValue { .. } => "previous_value",
            WrapperConfig::IncrementalSetpoint { .. } => "incremental_setpoint",
            WrapperConfig::MultiObs { .. } => "multi_obs",
            WrapperConfig::MultiObjective { .. } => "multi_objective",
            WrapperConfig::Logger => "logger",
        }
    }

    /// Wrappers that read named raw fields.
    fn reads_raw_fields(&self) -> bool {
        matches!(
            self,
            WrapperConfig::Datetime | WrapperConfig::PreviousValue { .. }
        )
    }
}

/// Complete description of one pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub env: EnvConfig,

    #[serde(default = "RewardConfig::five_zone")]
    pub reward: RewardConfig,

    /// Innermost first
    #[serde(default)]
    pub wrappers: Vec<WrapperConfig>,
}

impl PipelineConfig {
    /// A bare bridge with the default 5-zone reward.
    pub fn new(env: EnvConfig) -> Self {
        Self {
            env,
            reward: RewardConfig::five_zone(),
            wrappers: Vec::new(),
        }
    }

    /// Adds `wrapper` outside the current stack.
    pub fn with_wrapper(mut self, wrapper: WrapperConfig) -> Self {
        self.wrappers.push(wrapper);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, EnvError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, EnvError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    /// Checks the wrapper order rules.
    pub fn validate(&self) -> Result<(), EnvError> {
        let wrappers = &self.wrappers;
        for (i, wrapper) in wrappers.iter().enumerate() {
            let outer = &wrappers[i + 1..];
            let raw_reader_outside = outer.iter().find(|w| w.reads_raw_fields());

            match wrapper {
                WrapperConfig::Normalization { .. } => {
                    if let Some(w) = raw_reader_outside {
                        return Err(EnvError::configuration(format!(
                            "{} wrapper reads raw fields and must sit inside normalization",
                            w.kind()
                        )));
                    }
                    if outer.iter().any(|w| matches!(w, WrapperConfig::Normalization { .. })) {
                        return Err(EnvError::configuration(
                            "at most one normalization wrapper is allowed",
                        ));
                    }
                }
                WrapperConfig::MultiObs { .. } => {
                    if let Some(w) = raw_reader_outside {
                        return Err(EnvError::configuration(format!(
                            "{} wrapper must sit inside multi_obs",
                            w.kind()
                        )));
                    }
                }
                WrapperConfig::Logger => {
                    if outer.iter().any(|w| matches!(w, WrapperConfig::Logger)) {
                        return Err(EnvError::configuration("at most one logger wrapper is allowed"));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Builds the pipeline described by `config`.
///
/// The ordering rules are checked before the bridge allocates its run
/// directory; each wrapper then checks its own prerequisites against the
/// schema of the stack below it.
pub fn build_pipeline(config: &PipelineConfig) -> Result<Box<dyn Env>, EnvError> {
    config.validate()?;

    let bridge = SimulationBridge::with_reward_config(config.env.clone(), &config.reward)?;
    let mut env: Box<dyn Env> = Box::new(bridge);

    for wrapper in &config.wrappers {
        env = wrap(env, wrapper)?;
    }

    info!(
        "[{}] Pipeline ready: {} wrapper(s), {} observation fields",
        config.env.env_name,
        config.wrappers.len(),
        env.observation_schema().len()
    );
    Ok(env)
}

fn wrap(env: Box<dyn Env>, wrapper: &WrapperConfig) -> Result<Box<dyn Env>, EnvError> {
    let wrapped: Box<dyn Env> = match wrapper {
        WrapperConfig::Normalization { ranges } => {
            let ranges = ranges.clone().unwrap_or_else(RangeTable::five_zone);
            Box::new(NormalizeObservation::new(env, &ranges)?)
        }
        WrapperConfig::Datetime => Box::new(DatetimeWrapper::new(env)?),
        WrapperConfig::PreviousValue { variables } => {
            Box::new(PreviousObservationWrapper::new(env, variables)?)
        }
        WrapperConfig::IncrementalSetpoint {
            initial_values,
            delta,
            step,
        } => {
            let incremental = match initial_values {
                Some(initial) => {
                    DiscreteIncrementalWrapper::new(env, initial.clone(), *delta, *step)?
                }
                None => DiscreteIncrementalWrapper::centered(env, *delta, *step)?,
            };
            Box::new(incremental)
        }
        WrapperConfig::MultiObs { n } => Box::new(MultiObsWrapper::new(env, *n)?),
        WrapperConfig::MultiObjective { terms } => {
            Box::new(MultiObjectiveReward::new(env, terms.clone())?)
        }
        WrapperConfig::Logger => Box::new(LoggerWrapper::new(env)),
    };
    Ok(wrapped)
}
