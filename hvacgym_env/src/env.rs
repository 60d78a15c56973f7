//! The step/reset contract shared by the bridge and every wrapper.

use crate::error::EnvError;
use crate::spaces::ActionSpace;
use crate::types::{Action, Info, Observation, ObservationSchema, RewardArity, Step};

/// The central interface of the control loop.
///
/// Implemented by the simulation bridge and by every transform wrapper.
/// Each wrapper owns exactly one inner `Env`, so a pipeline is a
/// singly-linked delegation chain whose outermost element exposes this
/// same contract.
///
/// # Lifecycle
///
/// ```text
/// reset() ──► step() ──► step() ──► ... ──► terminated/truncated
///    ▲                                            │
///    └────────────────────────────────────────────┘
/// close() may be called at any point and more than once.
/// ```
///
/// # Single flight
///
/// Every operation takes `&mut self`: a pipeline never has two calls in
/// flight. Independent pipelines share nothing.
pub trait Env {
    /// Starts a new episode and returns its first observation.
    ///
    /// Terminates the previous episode's engine process if it is still
    /// alive. The returned info is never empty.
    fn reset(&mut self) -> Result<(Observation, Info), EnvError>;

    /// Applies `action` for one timestep.
    ///
    /// # Returns
    /// * `Err(EnvError::InvalidState)` - before `reset()` or after `close()`
    /// * `Err(EnvError::SimulationCrashed)` - the engine died; reset required
    fn step(&mut self, action: Action) -> Result<Step, EnvError>;

    /// Terminates the engine and releases the episode. Idempotent.
    fn close(&mut self) -> Result<(), EnvError>;

    /// The effective observation layout at this point of the chain.
    fn observation_schema(&self) -> &ObservationSchema;

    /// The actions accepted by `step()` at this point of the chain.
    fn action_space(&self) -> &ActionSpace;

    /// Names of the setpoints reported in `Info::action`.
    fn action_variables(&self) -> &[String];

    /// The reward shape produced by `step()` at this point of the chain.
    fn reward_arity(&self) -> &RewardArity;

    /// Names of the reward components available in `Info::reward_terms`.
    fn reward_terms(&self) -> &[String];

    /// The last observation before normalization, if a normalization
    /// wrapper sits at or below this point of the chain and an episode
    /// has started.
    fn unwrapped_observation(&self) -> Option<&[f64]>;
}

impl<E: Env + ?Sized> Env for Box<E> {
    fn reset(&mut self) -> Result<(Observation, Info), EnvError> {
        (**self).reset()
    }

    fn step(&mut self, action: Action) -> Result<Step, EnvError> {
        (**self).step(action)
    }

    fn close(&mut self) -> Result<(), EnvError> {
        (**self).close()
    }

    fn observation_schema(&self) -> &ObservationSchema {
        (**self).observation_schema()
    }

    fn action_space(&self) -> &ActionSpace {
        (**self).action_space()
    }

    fn action_variables(&self) -> &[String] {
        (**self).action_variables()
    }

    fn reward_arity(&self) -> &RewardArity {
        (**self).reward_arity()
    }

    fn reward_terms(&self) -> &[String] {
        (**self).reward_terms()
    }

    fn unwrapped_observation(&self) -> Option<&[f64]> {
        (**self).unwrapped_observation()
    }
}
