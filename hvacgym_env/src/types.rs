//! Common types for the hvacgym step/reset contract.

use crate::error::EnvError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// A flat observation vector. Its layout is described by an
/// [`ObservationSchema`] at the same point of the wrapper chain.
pub type Observation = Vec<f64>;

/// Unique identifier for one bridge run (a sequence of episodes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Creates a new random RunId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Show first 8 chars for readability
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Ordered variable names of an observation vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationSchema {
    names: Vec<String>,
}

impl ObservationSchema {
    /// Creates a schema, rejecting duplicate or empty names.
    pub fn new(names: Vec<String>) -> Result<Self, EnvError> {
        for (i, name) in names.iter().enumerate() {
            if name.is_empty() {
                return Err(EnvError::configuration(format!(
                    "observation variable #{} has an empty name",
                    i
                )));
            }
            if names[..i].contains(name) {
                return Err(EnvError::configuration(format!(
                    "observation variable '{}' appears more than once",
                    name
                )));
            }
        }
        Ok(Self { names })
    }

    /// Builds a schema from string slices.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, EnvError> {
        Self::new(names.iter().map(|n| n.as_ref().to_string()).collect())
    }

    /// Variable names in vector order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the schema has no variables.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of a variable in the vector.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Whether a variable is present.
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Like [`index_of`](Self::index_of), but fails with a configuration
    /// error naming the component that needed the variable.
    pub fn require(&self, name: &str, needed_by: &str) -> Result<usize, EnvError> {
        self.index_of(name).ok_or_else(|| {
            EnvError::configuration(format!(
                "{} requires observation variable '{}', which is not in the current schema",
                needed_by, name
            ))
        })
    }

    /// Pairs each name with the matching value of `observation`.
    pub fn zip<'a>(&'a self, observation: &'a [f64]) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        self.names.iter().map(String::as_str).zip(observation.iter().copied())
    }
}

/// An action accepted by [`Env::step`](crate::Env::step).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Index into a finite action set
    Discrete(usize),

    /// Concrete setpoint values
    Continuous(Vec<f64>),
}

impl From<usize> for Action {
    fn from(index: usize) -> Self {
        Action::Discrete(index)
    }
}

impl From<Vec<f64>> for Action {
    fn from(values: Vec<f64>) -> Self {
        Action::Continuous(values)
    }
}

/// Reward returned by a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reward {
    Scalar(f64),

    /// One value per named term, in the order advertised by
    /// [`RewardArity::Vector`].
    Vector(Vec<f64>),
}

impl Reward {
    /// Scalar value, or the sum of all terms.
    pub fn total(&self) -> f64 {
        match self {
            Reward::Scalar(v) => *v,
            Reward::Vector(values) => values.iter().sum(),
        }
    }

    /// Number of reward components.
    pub fn arity(&self) -> usize {
        match self {
            Reward::Scalar(_) => 1,
            Reward::Vector(values) => values.len(),
        }
    }

    /// Returns the terms if this is a vector reward.
    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            Reward::Scalar(_) => None,
            Reward::Vector(values) => Some(values),
        }
    }
}

/// The reward shape an environment produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardArity {
    Scalar,
    Vector(Vec<String>),
}

impl RewardArity {
    /// Whether a reward value has the advertised shape.
    pub fn matches(&self, reward: &Reward) -> bool {
        match (self, reward) {
            (RewardArity::Scalar, Reward::Scalar(_)) => true,
            (RewardArity::Vector(names), Reward::Vector(values)) => names.len() == values.len(),
            _ => false,
        }
    }
}

/// A named component of the reward breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardTerm {
    pub name: String,
    pub value: f64,
}

impl RewardTerm {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Side information returned by `reset()` and `step()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// Bridge run this episode belongs to
    pub run_id: Option<RunId>,

    /// Episode number (1-based)
    pub episode: u32,

    /// Steps taken since reset
    pub timestep: u64,

    /// Simulated seconds since reset (`timestep * step_size`)
    pub time_elapsed: u64,

    /// Simulated calendar date of the returned observation
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,

    /// Setpoint vector actually applied by the engine this step
    pub action: Vec<f64>,

    /// Scalar reward before any reward-shaping wrapper
    pub reward: f64,

    /// Named reward components
    pub reward_terms: Vec<RewardTerm>,

    /// Total HVAC electric demand used by the reward (W)
    pub total_power: f64,

    /// Degrees outside the comfort range used by the reward
    pub abs_comfort: f64,

    /// Episode working directory
    pub working_dir: Option<PathBuf>,

    /// Run directory holding all episode directories
    pub run_dir: Option<PathBuf>,

    /// Configuration echo, present after `reset()`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

impl Info {
    /// Looks up a reward term by name.
    pub fn reward_term(&self, name: &str) -> Option<f64> {
        self.reward_terms
            .iter()
            .find(|term| term.name == name)
            .map(|term| term.value)
    }

    /// Whether the info carries any data (a default `Info` does not).
    pub fn is_empty(&self) -> bool {
        *self == Info::default()
    }
}

/// Result of a single environment step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub observation: Observation,
    pub reward: Reward,

    /// The engine ended the episode (end of run period)
    pub terminated: bool,

    /// The episode was cut by an external step limit
    pub truncated: bool,

    pub info: Info,
}

impl Step {
    /// Whether the episode is over for either reason.
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}
