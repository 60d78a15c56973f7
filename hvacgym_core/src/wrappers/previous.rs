//! Previous-value augmentation.

use super::normalize::PREVIOUS_SUFFIX;
use hvacgym_env::{
    Action, ActionSpace, Env, EnvError, Info, Observation, ObservationSchema, RewardArity, Step,
};

/// Appends `<name>_previous` for each selected variable, holding its value
/// from the step before. The fields are zero right after reset.
pub struct PreviousObservationWrapper<E: Env> {
    inner: E,
    schema: ObservationSchema,

    /// Positions of the selected variables in the inner observation
    indices: Vec<usize>,

    /// Lags the live observation by one step
    previous: Vec<f64>,
}

impl<E: Env> PreviousObservationWrapper<E> {
    pub fn new(inner: E, variables: &[String]) -> Result<Self, EnvError> {
        if variables.is_empty() {
            return Err(EnvError::configuration(
                "PreviousObservationWrapper needs at least one variable",
            ));
        }
        let base = inner.observation_schema();
        let indices = variables
            .iter()
            .map(|name| base.require(name, "PreviousObservationWrapper"))
            .collect::<Result<Vec<_>, _>>()?;

        let names = base
            .names()
            .iter()
            .cloned()
            .chain(variables.iter().map(|v| format!("{}{}", v, PREVIOUS_SUFFIX)))
            .collect();
        let schema = ObservationSchema::new(names)?;

        Ok(Self {
            inner,
            schema,
            previous: vec![0.0; indices.len()],
            indices,
        })
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// Selected values of the last observation; the next one carries them
    /// as its `_previous` fields.
    pub fn previous_observation(&self) -> &[f64] {
        &self.previous
    }

    /// Appends the buffer, then captures the current values for the next
    /// observation.
    fn augment(&mut self, raw: Observation) -> Result<Observation, EnvError> {
        let expected = self.inner.observation_schema().len();
        if raw.len() != expected {
            return Err(EnvError::configuration(format!(
                "observation has {} values, schema has {}",
                raw.len(),
                expected
            )));
        }
        let mut out = raw;
        let current: Vec<f64> = self.indices.iter().map(|&i| out[i]).collect();
        out.extend_from_slice(&self.previous);
        self.previous = current;
        Ok(out)
    }
}

impl<E: Env> Env for PreviousObservationWrapper<E> {
    fn reset(&mut self) -> Result<(Observation, Info), EnvError> {
        let (raw, info) = self.inner.reset()?;
        self.previous.iter_mut().for_each(|v| *v = 0.0);
        Ok((self.augment(raw)?, info))
    }

    fn step(&mut self, action: Action) -> Result<Step, EnvError> {
        let mut step = self.inner.step(action)?;
        let raw = std::mem::take(&mut step.observation);
        step.observation = self.augment(raw)?;
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
        self.inner.unwrapped_observation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{calendar_env, ScriptedEnv};

    fn wrap() -> PreviousObservationWrapper<crate::testing::ScriptedEnv> {
        PreviousObservationWrapper::new(calendar_env(), &["temp".to_string(), "hour".to_string()])
            .unwrap()
    }

    #[test]
    fn test_schema_appends_previous_fields() {
        let env = wrap();
        let names = env.observation_schema().names();
        assert_eq!(names.len(), 7);
        assert_eq!(names[5..], ["temp_previous", "hour_previous"]);
    }

    #[test]
    fn test_zero_on_reset_then_lags_one_step() {
        let mut env = wrap();

        let (obs, _) = env.reset().unwrap();
        assert_eq!(obs[5..], [0.0, 0.0]);

        let step = env.step(Action::Continuous(vec![20.0, 25.0])).unwrap();
        assert_eq!(step.observation[4], 21.0);
        assert_eq!(step.observation[5..], [20.0, 0.0]);

        let step = env.step(Action::Continuous(vec![20.0, 25.0])).unwrap();
        assert_eq!(step.observation[5..], [21.0, 6.0]);
        assert_eq!(env.previous_observation(), &[22.0, 12.0]);
    }

    #[test]
    fn test_reset_clears_buffer() {
        let mut env = wrap();
        env.reset().unwrap();
        env.step(Action::Continuous(vec![20.0, 25.0])).unwrap();

        let (obs, _) = env.reset().unwrap();
        assert_eq!(obs[5..], [0.0, 0.0]);
    }

    #[test]
    fn test_short_observation_is_an_error() {
        let inner = ScriptedEnv::new(&["temp", "power"], vec![vec![20.0, 1.0], vec![21.0]]);
        let mut env = PreviousObservationWrapper::new(inner, &["power".to_string()]).unwrap();

        env.reset().unwrap();
        let err = env.step(Action::Continuous(vec![20.0, 25.0])).unwrap_err();
        assert!(matches!(err, EnvError::Configuration(_)));
    }

    #[test]
    fn test_unknown_variable() {
        let result = PreviousObservationWrapper::new(calendar_env(), &["humidity".to_string()]);
        assert!(matches!(result, Err(EnvError::Configuration(_))));
    }
}
