//! Stacked observation history.

use hvacgym_env::{
    Action, ActionSpace, Env, EnvError, Info, Observation, ObservationSchema, RewardArity, Step,
};
use std::collections::VecDeque;

/// Exposes the last `n` observations concatenated, oldest first.
///
/// Reset fills the history with `n` copies of the first observation.
/// Field names get a `_t-k` suffix, `_t-0` being the newest. When the inner
/// environment exposes raw values, they are stacked the same way.
pub struct MultiObsWrapper<E: Env> {
    inner: E,
    schema: ObservationSchema,
    n: usize,
    history: VecDeque<Observation>,
    raw_history: VecDeque<Observation>,
    raw_stacked: Option<Observation>,
}

impl<E: Env> MultiObsWrapper<E> {
    pub fn new(inner: E, n: usize) -> Result<Self, EnvError> {
        if n == 0 {
            return Err(EnvError::configuration("MultiObsWrapper needs n >= 1"));
        }

        let base = inner.observation_schema();
        let names = (0..n)
            .rev()
            .flat_map(|k| base.names().iter().map(move |name| format!("{}_t-{}", name, k)))
            .collect();
        let schema = ObservationSchema::new(names)?;

        Ok(Self {
            inner,
            schema,
            n,
            history: VecDeque::with_capacity(n),
            raw_history: VecDeque::with_capacity(n),
            raw_stacked: None,
        })
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// History length.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Buffered observations, oldest first.
    pub fn history(&self) -> &VecDeque<Observation> {
        &self.history
    }

    fn stacked(&self) -> Observation {
        self.history.iter().flatten().copied().collect()
    }

    /// Raw counterpart of the newest observation, if the inner environment
    /// has one of matching length.
    fn inner_raw(&self) -> Option<Observation> {
        let len = self.inner.observation_schema().len();
        self.inner
            .unwrapped_observation()
            .filter(|raw| raw.len() == len)
            .map(<[f64]>::to_vec)
    }

    fn push_raw(&mut self, fill: bool) {
        match self.inner_raw() {
            Some(raw) => {
                if fill {
                    self.raw_history.clear();
                    for _ in 0..self.n {
                        self.raw_history.push_back(raw.clone());
                    }
                } else {
                    self.raw_history.pop_front();
                    self.raw_history.push_back(raw);
                }
                self.raw_stacked = Some(self.raw_history.iter().flatten().copied().collect());
            }
            None => {
                self.raw_history.clear();
                self.raw_stacked = None;
            }
        }
    }
}

impl<E: Env> Env for MultiObsWrapper<E> {
    fn reset(&mut self) -> Result<(Observation, Info), EnvError> {
        let (observation, info) = self.inner.reset()?;
        self.history.clear();
        for _ in 0..self.n {
            self.history.push_back(observation.clone());
        }
        self.push_raw(true);
        Ok((self.stacked(), info))
    }

    fn step(&mut self, action: Action) -> Result<Step, EnvError> {
        if self.history.is_empty() {
            return Err(EnvError::invalid_state("step() called before reset()"));
        }
        let mut step = self.inner.step(action)?;
        self.history.pop_front();
        self.history.push_back(std::mem::take(&mut step.observation));
        let fill = self.raw_history.len() != self.n;
        self.push_raw(fill);
        step.observation = self.stacked();
        Ok(step)
    }

    fn close(&mut self) -> Result<(), EnvError> {
        self.inner.close()
    }

    fn observation_schema(&self) -> &ObservationSchema {
        &self.schema
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
        self.raw_stacked.as_deref()
    }
}
