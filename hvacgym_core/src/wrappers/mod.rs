//! Transform wrappers.
//!
//! Every wrapper owns exactly one inner [`Env`](hvacgym_env::Env) and is an
//! `Env` itself, so wrappers stack statically (`Logger<Normalize<Bridge>>`)
//! or dynamically through `Box<dyn Env>`. A wrapper that changes the
//! observation layout exposes the changed [`ObservationSchema`]; it never
//! mutates what its inner environment returned in place.
//!
//! [`ObservationSchema`]: hvacgym_env::ObservationSchema

mod datetime;
mod incremental;
mod logger;
mod multiobjective;
mod multiobs;
mod normalize;
mod previous;

pub use datetime::DatetimeWrapper;
pub use incremental::DiscreteIncrementalWrapper;
pub use logger::LoggerWrapper;
pub use multiobjective::MultiObjectiveReward;
pub use multiobs::MultiObsWrapper;
pub use normalize::{NormalizeObservation, RangeTable, PREVIOUS_SUFFIX};
pub use previous::PreviousObservationWrapper;
