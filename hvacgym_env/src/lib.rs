//! hvacgym Environment Contract
//!
//! This crate defines the step/reset interface shared by the simulation
//! bridge (which drives an external building-energy engine) and every
//! transform wrapper stacked on top of it.
//!
//! # Core Concept: One Trait, Many Layers
//!
//! The bridge and each wrapper implement [`Env`]. A wrapper owns exactly
//! one inner `Env` and transforms what flows through it:
//!
//! ```text
//! caller ─► Logger ─► Normalize ─► Datetime ─► Bridge ─► engine process
//!        ◄─────────── transformed (obs, reward, info) ◄─┘
//! ```
//!
//! Each layer advertises its *effective* schema (observation names, action
//! space, reward arity), so callers never have to assume the bridge's raw
//! layout.
//!
//! # Example
//!
//! ```ignore
//! use hvacgym_env::{Action, Env};
//!
//! fn run_episode<E: Env>(env: &mut E) -> Result<f64, hvacgym_env::EnvError> {
//!     let (_obs, _info) = env.reset()?;
//!     let mut total = 0.0;
//!     loop {
//!         let step = env.step(Action::Discrete(0))?;
//!         total += step.reward.total();
//!         if step.done() {
//!             return Ok(total);
//!         }
//!     }
//! }
//! ```

mod env;
mod error;
mod spaces;
mod types;

pub use env::Env;
pub use error::EnvError;
pub use spaces::ActionSpace;
pub use types::{
    Action, Info, Observation, ObservationSchema, Reward, RewardArity, RewardTerm, RunId, Step,
};
