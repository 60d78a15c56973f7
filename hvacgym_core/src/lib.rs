//! hvacgym Core - Simulation Bridge and Transform Wrappers
//!
//! Turns an external building-energy engine into a step/reset control loop:
//!
//! 1. **Frame protocol** ([`codec`]): one setpoint line in, one state line out
//! 2. **Process supervision** ([`supervisor`]): one engine process per episode,
//!    bounded start and terminate waits
//! 3. **Simulation bridge** ([`bridge`]): episode lifecycle, calendar fields,
//!    pluggable reward
//! 4. **Wrappers** ([`wrappers`]): normalization, datetime encoding, history,
//!    incremental setpoints, vector rewards and CSV episode logs
//!
//! Pipelines are assembled from a [`PipelineConfig`] by [`build_pipeline`].

pub mod bridge;
pub mod calendar;
pub mod checker;
pub mod codec;
pub mod config;
pub mod monitor;
pub mod pipeline;
pub mod presets;
pub mod reward;
pub mod supervisor;
pub mod wrappers;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types for convenience
pub use bridge::{BridgeState, SimulationBridge};
pub use checker::check_env;
pub use config::{ActionConfig, ActionKind, EngineConfig, EnvConfig, RunPeriod};
pub use pipeline::{build_pipeline, PipelineConfig, WrapperConfig};
pub use presets::EnvironmentId;
pub use reward::{ExpReward, LinearReward, RewardConfig, RewardFunction, RewardParams};
