//! Min-max observation normalization.

use hvacgym_env::{
    Action, ActionSpace, Env, EnvError, Info, Observation, ObservationSchema, RewardArity, Step,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Suffix of the fields added by [`super::PreviousObservationWrapper`]
pub const PREVIOUS_SUFFIX: &str = "_previous";

/// Variable name → expected (min, max).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RangeTable {
    ranges: BTreeMap<String, (f64, f64)>,
}

impl RangeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, min: f64, max: f64) {
        self.ranges.insert(name.into(), (min, max));
    }

    /// Range of `name`, or of its base variable for `<base>_previous`.
    pub fn lookup(&self, name: &str) -> Option<(f64, f64)> {
        self.ranges.get(name).copied().or_else(|| {
            name.strip_suffix(PREVIOUS_SUFFIX)
                .and_then(|base| self.ranges.get(base).copied())
        })
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl FromIterator<(String, (f64, f64))> for RangeTable {
    fn from_iter<I: IntoIterator<Item = (String, (f64, f64))>>(iter: I) -> Self {
        Self {
            ranges: iter.into_iter().collect(),
        }
    }
}

/// Maps every variable to `(x - min) / (max - min)`.
///
/// Values outside `[min, max]` are extrapolated, not clamped. The raw
/// vector of the last reset/step stays available through
/// [`Env::unwrapped_observation`].
pub struct NormalizeObservation<E: Env> {
    inner: E,

    /// (min, span) per schema position
    scale: Vec<(f64, f64)>,

    unwrapped: Option<Observation>,
}

impl<E: Env> NormalizeObservation<E> {
    /// Wraps `inner`; every variable of its schema needs a range with
    /// `max > min`.
    pub fn new(inner: E, ranges: &RangeTable) -> Result<Self, EnvError> {
        let scale = inner
            .observation_schema()
            .names()
            .iter()
            .map(|name| match ranges.lookup(name) {
                Some((min, max)) if max > min && min.is_finite() && max.is_finite() => {
                    Ok((min, max - min))
                }
                Some((min, max)) => Err(EnvError::configuration(format!(
                    "range for '{}' is empty or inverted: [{}, {}]",
                    name, min, max
                ))),
                None => Err(EnvError::configuration(format!(
                    "range table has no entry for '{}'",
                    name
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            inner,
            scale,
            unwrapped: None,
        })
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut E {
        &mut self.inner
    }

    fn normalize(&self, raw: &[f64]) -> Result<Observation, EnvError> {
        if raw.len() != self.scale.len() {
            return Err(EnvError::configuration(format!(
                "observation has {} values, schema has {}",
                raw.len(),
                self.scale.len()
            )));
        }
        Ok(raw
            .iter()
            .zip(&self.scale)
            .map(|(x, (min, span))| (x - min) / span)
            .collect())
    }
}

impl<E: Env> Env for NormalizeObservation<E> {
    fn reset(&mut self) -> Result<(Observation, Info), EnvError> {
        let (raw, info) = self.inner.reset()?;
        let observation = self.normalize(&raw)?;
        self.unwrapped = Some(raw);
        Ok((observation, info))
    }

    fn step(&mut self, action: Action) -> Result<Step, EnvError> {
        let mut step = self.inner.step(action)?;
        let observation = self.normalize(&step.observation)?;
        self.unwrapped = Some(std::mem::replace(&mut step.observation, observation));
        Ok(step)
    }

    fn close(&mut self) -> Result<(), EnvError> {
        self.inner.close()
    }

    fn observation_schema(&self) -> &ObservationSchema {
        self.inner.observation_schema()
    }

    fn action_space(&self) -> &ActionSpace {
        self.inner.action_space()
    }

    fn action_variables(&self) -> &[String] {
        self.inner.action_variables()
    }

    fn reward_arity(&self) -> &RewardArity {
        self.inner.reward_arity()
    }

    fn reward_terms(&self) -> &[String] {
        self.inner.reward_terms()
    }

    fn unwrapped_observation(&self) -> Option<&[f64]> {
        self.unwrapped.as_deref()
    }
}
