//! hvacgym Simulation Harness
//!
//! Everything needed to exercise a pipeline end to end without a real
//! building-energy engine:
//!
//! - **Agents** ([`RandomAgent`], [`ConstantAgent`]) choose actions
//! - **Episode runner** ([`EpisodeRunner`]) drives reset/step until each
//!   episode ends and aggregates the results
//! - **Exporter** ([`RunExport`]) writes per-step records as JSON
//! - **Building oracle** ([`BuildingOracle`]) is the toy thermal model
//!   behind the `hvacgym-mock-engine` binary
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐        ┌──────────────────────────┐
//! │ EpisodeRunner                │        │ hvacgym-mock-engine      │
//! │   Agent ──► Box<dyn Env> ────┼─stdin─►│   frame codec            │
//! │            (wrappers+bridge) │◄stdout─┤   BuildingOracle         │
//! └──────────────────────────────┘        └──────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use hvacgym_core::{build_pipeline, EngineConfig, EnvConfig, EnvironmentId, PipelineConfig};
//! use hvacgym_sim::{EpisodeRunner, RandomAgent};
//!
//! let env = EnvConfig::preset(EnvironmentId::Demo)
//!     .with_engine(EngineConfig::new("hvacgym-mock-engine"));
//! let mut pipeline = build_pipeline(&PipelineConfig::new(env))?;
//! let results = EpisodeRunner::new(1).run(pipeline.as_mut(), &mut RandomAgent::new(42));
//! ```

mod agent;
mod exporter;
mod oracle;
mod runner;

pub use agent::{Agent, ConstantAgent, RandomAgent};
pub use exporter::{EpisodeExport, RunExport, StepFrame};
pub use oracle::{mean_outdoor_temperature, BuildingOracle, Signal, BASE_POWER, INITIAL_SETPOINTS};
pub use runner::{EpisodeResult, EpisodeRunner};
