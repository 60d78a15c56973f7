//! Bridge configuration.
//!
//! The configuration is an opaque, serde-serialisable object produced by a
//! preset ([`crate::presets`]) or loaded from JSON. It is validated once,
//! eagerly, when the bridge is constructed.

use chrono::NaiveDate;
use hvacgym_env::{ActionSpace, EnvError, ObservationSchema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Calendar variables the bridge prepends to every observation.
pub const TIME_VARIABLES: [&str; 4] = ["year", "month", "day", "hour"];

/// How to launch the external engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Executable speaking the frame protocol on stdin/stdout
    pub program: PathBuf,

    /// Extra command-line arguments
    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment variables for the process
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl EngineConfig {
    /// Creates an engine configuration with no extra arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    /// Adds an environment variable for the engine process.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Simulated calendar span of one episode (both ends inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl RunPeriod {
    /// Number of simulated days.
    pub fn days(&self) -> u64 {
        ((self.end - self.start).num_days() + 1).max(0) as u64
    }
}

/// How discrete or continuous actions become setpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    /// `mapping[i]` is the setpoint vector applied for action `i`
    Discrete { mapping: Vec<Vec<f64>> },

    /// Setpoints are passed through; bounds are advertised in the action space
    Continuous { low: Vec<f64>, high: Vec<f64> },
}

/// Setpoint names plus the action kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionConfig {
    /// Names of the setpoints, in the order sent to the engine
    pub variables: Vec<String>,

    pub kind: ActionKind,
}

/// Complete configuration of one simulation bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Name used for the run directory (`<output_root>/<env_name>-res<k>`)
    pub env_name: String,

    /// Parent directory of all run directories
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    pub engine: EngineConfig,

    /// Building model file handed to the engine
    pub building: PathBuf,

    /// Weather file handed to the engine
    pub weather: PathBuf,

    /// Engine output variables, in frame order
    pub observation_variables: Vec<String>,

    pub action: ActionConfig,

    /// Simulation timesteps per hour (step size = 3600 / timesteps_per_hour)
    pub timesteps_per_hour: u32,

    pub run_period: RunPeriod,

    /// Truncate episodes after this many steps
    #[serde(default)]
    pub max_episode_steps: Option<u64>,

    /// Bounded wait for the engine's first frame
    #[serde(default = "default_start_timeout_ms")]
    pub start_timeout_ms: u64,

    /// Bounded wait before force-killing the engine
    #[serde(default = "default_terminate_timeout_ms")]
    pub terminate_timeout_ms: u64,
}

fn default_output_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_start_timeout_ms() -> u64 {
    30_000
}

fn default_terminate_timeout_ms() -> u64 {
    2_000
}

impl EnvConfig {
    /// Simulated seconds per step.
    pub fn step_size(&self) -> u64 {
        3600 / u64::from(self.timesteps_per_hour.max(1))
    }

    /// Number of steps in a full run period.
    pub fn episode_length(&self) -> u64 {
        self.run_period.days() * 24 * u64::from(self.timesteps_per_hour)
    }

    /// Observation layout emitted by the bridge.
    pub fn observation_schema(&self) -> Result<ObservationSchema, EnvError> {
        let names = TIME_VARIABLES
            .iter()
            .map(|s| s.to_string())
            .chain(self.observation_variables.iter().cloned())
            .collect();
        ObservationSchema::new(names)
    }

    /// Action space advertised by the bridge.
    pub fn action_space(&self) -> ActionSpace {
        match &self.action.kind {
            ActionKind::Discrete { mapping } => ActionSpace::Discrete { n: mapping.len() },
            ActionKind::Continuous { low, high } => ActionSpace::Continuous {
                low: low.clone(),
                high: high.clone(),
            },
        }
    }

    /// Sets the output root.
    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    /// Sets the engine.
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Sets the truncation limit.
    pub fn with_max_episode_steps(mut self, steps: u64) -> Self {
        self.max_episode_steps = Some(steps);
        self
    }

    /// Checks every constraint the bridge relies on.
    pub fn validate(&self) -> Result<(), EnvError> {
        if self.env_name.is_empty() || self.env_name.contains(std::path::MAIN_SEPARATOR) {
            return Err(EnvError::configuration(format!(
                "env_name '{}' must be a non-empty single path component",
                self.env_name
            )));
        }

        if self.observation_variables.is_empty() {
            return Err(EnvError::configuration("observation_variables is empty"));
        }
        self.observation_schema()?;

        let tph = self.timesteps_per_hour;
        if tph == 0 || tph > 60 || 3600 % tph != 0 {
            return Err(EnvError::configuration(format!(
                "timesteps_per_hour must divide 3600 and be in 1..=60, got {}",
                tph
            )));
        }

        if self.run_period.end < self.run_period.start {
            return Err(EnvError::configuration(format!(
                "run period ends ({}) before it starts ({})",
                self.run_period.end, self.run_period.start
            )));
        }

        if self.max_episode_steps == Some(0) {
            return Err(EnvError::configuration("max_episode_steps must be positive"));
        }

        if self.start_timeout_ms == 0 || self.terminate_timeout_ms == 0 {
            return Err(EnvError::configuration("process timeouts must be positive"));
        }

        self.validate_action()
    }

    fn validate_action(&self) -> Result<(), EnvError> {
        let dim = self.action.variables.len();
        if dim == 0 {
            return Err(EnvError::configuration("action.variables is empty"));
        }

        match &self.action.kind {
            ActionKind::Discrete { mapping } => {
                if mapping.is_empty() {
                    return Err(EnvError::configuration("discrete action mapping is empty"));
                }
                for (i, setpoints) in mapping.iter().enumerate() {
                    if setpoints.len() != dim {
                        return Err(EnvError::configuration(format!(
                            "action mapping entry {} has {} setpoints, expected {}",
                            i,
                            setpoints.len(),
                            dim
                        )));
                    }
                    if setpoints.iter().any(|v| !v.is_finite()) {
                        return Err(EnvError::configuration(format!(
                            "action mapping entry {} is not finite",
                            i
                        )));
                    }
                }
            }
            ActionKind::Continuous { low, high } => {
                if low.len() != dim || high.len() != dim {
                    return Err(EnvError::configuration(format!(
                        "continuous bounds have {}/{} entries, expected {}",
                        low.len(),
                        high.len(),
                        dim
                    )));
                }
                for (i, (lo, hi)) in low.iter().zip(high.iter()).enumerate() {
                    if !lo.is_finite() || !hi.is_finite() || lo > hi {
                        return Err(EnvError::configuration(format!(
                            "continuous bounds for '{}' are invalid: [{}, {}]",
                            self.action.variables[i], lo, hi
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}
