//! Vector-valued reward.

use hvacgym_env::{
    Action, ActionSpace, Env, EnvError, Info, Observation, ObservationSchema, Reward, RewardArity,
    Step,
};

/// Replaces the scalar reward with the named terms from `Info`, in the
/// configured order.
pub struct MultiObjectiveReward<E: Env> {
    inner: E,
    arity: RewardArity,
    terms: Vec<String>,
}

impl<E: Env> MultiObjectiveReward<E> {
    /// `terms` must be a non-empty subset of `inner.reward_terms()`.
    pub fn new(inner: E, terms: Vec<String>) -> Result<Self, EnvError> {
        if terms.is_empty() {
            return Err(EnvError::configuration("MultiObjectiveReward needs at least one term"));
        }
        if let Some(missing) = terms.iter().find(|t| !inner.reward_terms().contains(t)) {
            return Err(EnvError::configuration(format!(
                "reward term '{}' is not produced (available: {})",
                missing,
                inner.reward_terms().join(", ")
            )));
        }

        Ok(Self {
            inner,
            arity: RewardArity::Vector(terms.clone()),
            terms,
        })
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

impl<E: Env> Env for MultiObjectiveReward<E> {
    fn reset(&mut self) -> Result<(Observation, Info), EnvError> {
        self.inner.reset()
    }

    fn step(&mut self, action: Action) -> Result<Step, EnvError> {
        let mut step = self.inner.step(action)?;
        let values = self
            .terms
            .iter()
            .map(|name| {
                step.info.reward_term(name).ok_or_else(|| {
                    EnvError::configuration(format!("step info lacks reward term '{}'", name))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        step.reward = Reward::Vector(values);
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
        &self.arity
    }

    fn reward_terms(&self) -> &[String] {
        self.inner.reward_terms()
    }

    fn unwrapped_observation(&self) -> Option<&[f64]> {
        self.inner.unwrapped_observation()
    }
}
