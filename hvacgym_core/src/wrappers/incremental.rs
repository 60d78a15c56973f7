//! Incremental setpoint control over a discrete action set.

use hvacgym_env::{
    Action, ActionSpace, Env, EnvError, Info, Observation, ObservationSchema, RewardArity, Step,
};

/// Turns a continuous setpoint environment into a discrete one where each
/// action nudges one setpoint.
///
/// With increments `v = [step, 2·step, …, delta, -step, …, -delta]`
/// (`m` values), action `0` keeps the setpoints and action `1 + i·m + j`
/// adds `v[j]` to setpoint `i`. Each dimension is clamped to the inner
/// action bounds on its own.
pub struct DiscreteIncrementalWrapper<E: Env> {
    inner: E,
    action_space: ActionSpace,
    values: Vec<f64>,
    initial: Vec<f64>,
    current: Vec<f64>,
    min: Vec<f64>,
    max: Vec<f64>,
}

impl<E: Env> DiscreteIncrementalWrapper<E> {
    /// # Arguments
    /// * `initial_values` - setpoints at the start of every episode
    /// * `delta` - largest single adjustment
    /// * `step` - adjustment granularity
    pub fn new(inner: E, initial_values: Vec<f64>, delta: f64, step: f64) -> Result<Self, EnvError> {
        let (min, max) = match inner.action_space() {
            ActionSpace::Continuous { low, high } => (low.clone(), high.clone()),
            ActionSpace::Discrete { .. } => {
                return Err(EnvError::configuration(
                    "DiscreteIncrementalWrapper needs a continuous inner action space",
                ))
            }
        };
        if initial_values.len() != min.len() {
            return Err(EnvError::configuration(format!(
                "{} initial setpoints given, action space has {} dimensions",
                initial_values.len(),
                min.len()
            )));
        }
        if !(step.is_finite() && delta.is_finite() && step > 0.0 && delta >= step) {
            return Err(EnvError::configuration(format!(
                "increments need 0 < step <= delta, got step={} delta={}",
                step, delta
            )));
        }

        let values = increments(delta, step);
        let n = 1 + min.len() * values.len();
        let initial = clamp(&initial_values, &min, &max);

        Ok(Self {
            inner,
            action_space: ActionSpace::Discrete { n },
            values,
            current: initial.clone(),
            initial,
            min,
            max,
        })
    }

    /// Initial setpoints halfway between the bounds.
    pub fn centered(inner: E, delta: f64, step: f64) -> Result<Self, EnvError> {
        let initial = match inner.action_space() {
            ActionSpace::Continuous { low, high } => {
                low.iter().zip(high).map(|(lo, hi)| (lo + hi) / 2.0).collect()
            }
            ActionSpace::Discrete { .. } => Vec::new(),
        };
        Self::new(inner, initial, delta, step)
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn current_setpoints(&self) -> &[f64] {
        &self.current
    }

    /// Overrides the setpoint state (clamped to the bounds).
    pub fn set_current_setpoints(&mut self, setpoints: &[f64]) -> Result<(), EnvError> {
        if setpoints.len() != self.current.len() {
            return Err(EnvError::invalid_action(format!(
                "{} setpoints given, expected {}",
                setpoints.len(),
                self.current.len()
            )));
        }
        self.current = clamp(setpoints, &self.min, &self.max);
        Ok(())
    }

    pub fn max_values(&self) -> &[f64] {
        &self.max
    }

    pub fn min_values(&self) -> &[f64] {
        &self.min
    }

    /// Adjustment values in action order.
    pub fn increments(&self) -> &[f64] {
        &self.values
    }

    /// Setpoints that `action` would produce from the current state.
    fn apply(&self, action: &Action) -> Result<Vec<f64>, EnvError> {
        let index = match action {
            Action::Discrete(index) => *index,
            Action::Continuous(_) => {
                return Err(EnvError::invalid_action(
                    "incremental control takes a discrete action",
                ))
            }
        };
        if !self.action_space.contains(action) {
            return Err(EnvError::invalid_action(format!(
                "action {} is outside {:?}",
                index, self.action_space
            )));
        }

        let mut target = self.current.clone();
        if index > 0 {
            let m = self.values.len();
            let dim = (index - 1) / m;
            let value = self.values[(index - 1) % m];
            target[dim] += value;
        }
        Ok(clamp(&target, &self.min, &self.max))
    }
}

fn increments(delta: f64, step: f64) -> Vec<f64> {
    let count = ((delta / step) + 1e-9).floor() as usize;
    let positive: Vec<f64> = (1..=count).map(|k| k as f64 * step).collect();
    let negative = positive.iter().map(|v| -v);
    positive.iter().copied().chain(negative).collect()
}

fn clamp(values: &[f64], min: &[f64], max: &[f64]) -> Vec<f64> {
    values
        .iter()
        .zip(min.iter().zip(max))
        .map(|(v, (lo, hi))| v.clamp(*lo, *hi))
        .collect()
}

impl<E: Env> Env for DiscreteIncrementalWrapper<E> {
    fn reset(&mut self) -> Result<(Observation, Info), EnvError> {
        let result = self.inner.reset()?;
        self.current = self.initial.clone();
        Ok(result)
    }

    fn step(&mut self, action: Action) -> Result<Step, EnvError> {
        let setpoints = self.apply(&action)?;
        let step = self.inner.step(Action::Continuous(setpoints.clone()))?;
        self.current = setpoints;
        Ok(step)
    }

    fn close(&mut self) -> Result<(), EnvError> {
        self.inner.close()
    }

    fn observation_schema(&self) -> &ObservationSchema {
        self.inner.observation_schema()
    }

    fn action_space(&self) -> &ActionSpace {
        &self.action_space
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
