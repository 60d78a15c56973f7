//! Error types for the hvacgym step/reset contract.

use thiserror::Error;

/// Errors surfaced by the simulation bridge and every wrapper.
///
/// None of these are retried inside the core. The caller decides whether
/// to `reset()` and continue.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Malformed or out-of-contract frame exchanged with the engine.
    /// The episode is invalid.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Operation called outside its valid lifecycle phase (caller bug).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The engine process died or reported a failure mid-episode.
    /// The caller must `reset()` before stepping again.
    #[error("Simulation crashed: {0}")]
    SimulationCrashed(String),

    /// Range table gaps, wrapper ordering violations, arity mismatches.
    /// Detected at construction or first use.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Action outside the advertised action space
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// A bounded wait (process start or terminate) expired
    #[error("Timeout after {0}ms")]
    Timeout(u64),

    /// Working directory or log file I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Episode log file could not be written
    #[error("CSV error: {0}")]
    Csv(String),

    /// Configuration file or info (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl EnvError {
    /// Creates a protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Creates an invalid state error.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Creates a crash error.
    pub fn crashed(msg: impl Into<String>) -> Self {
        Self::SimulationCrashed(msg.into())
    }

    /// Creates a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates an invalid action error.
    pub fn invalid_action(msg: impl Into<String>) -> Self {
        Self::InvalidAction(msg.into())
    }

    /// Returns true if the episode can no longer be stepped and must be reset.
    pub fn requires_reset(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::SimulationCrashed(_))
    }
}

impl From<serde_json::Error> for EnvError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
