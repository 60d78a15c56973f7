//! Cyclical calendar encoding.

use crate::calendar::is_weekend;
use hvacgym_env::{
    Action, ActionSpace, Env, EnvError, Info, Observation, ObservationSchema, RewardArity, Step,
};
use std::f64::consts::PI;

/// Replaces `day`, `month` and `hour` in place:
///
/// ```text
/// year, month,              day,        hour,               ...
/// year, month_sin, month_cos, is_weekend, hour_sin, hour_cos, ...
/// ```
///
/// `year` stays, so the observation grows by two fields.
pub struct DatetimeWrapper<E: Env> {
    inner: E,
    schema: ObservationSchema,
    year: usize,
    month: usize,
    day: usize,
    hour: usize,
}

impl<E: Env> DatetimeWrapper<E> {
    pub fn new(inner: E) -> Result<Self, EnvError> {
        let base = inner.observation_schema();
        let year = base.require("year", "DatetimeWrapper")?;
        let month = base.require("month", "DatetimeWrapper")?;
        let day = base.require("day", "DatetimeWrapper")?;
        let hour = base.require("hour", "DatetimeWrapper")?;

        let mut names = Vec::with_capacity(base.len() + 2);
        for (i, name) in base.names().iter().enumerate() {
            if i == month {
                names.push("month_sin".to_string());
                names.push("month_cos".to_string());
            } else if i == day {
                names.push("is_weekend".to_string());
            } else if i == hour {
                names.push("hour_sin".to_string());
                names.push("hour_cos".to_string());
            } else {
                names.push(name.clone());
            }
        }
        let schema = ObservationSchema::new(names)?;

        Ok(Self {
            inner,
            schema,
            year,
            month,
            day,
            hour,
        })
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    fn encode(&self, raw: &[f64]) -> Result<Observation, EnvError> {
        let expected = self.inner.observation_schema().len();
        if raw.len() != expected {
            return Err(EnvError::configuration(format!(
                "observation has {} values, schema has {}",
                raw.len(),
                expected
            )));
        }
        let year = raw[self.year] as i32;
        let month = raw[self.month];
        let day = raw[self.day];
        let hour = raw[self.hour];
        let weekend = is_weekend(year, month as u32, day as u32)?;

        let mut out = Vec::with_capacity(self.schema.len());
        for (i, &value) in raw.iter().enumerate() {
            if i == self.month {
                let angle = 2.0 * PI * month / 12.0;
                out.push(angle.sin());
                out.push(angle.cos());
            } else if i == self.day {
                out.push(if weekend { 1.0 } else { 0.0 });
            } else if i == self.hour {
                let angle = 2.0 * PI * hour / 24.0;
                out.push(angle.sin());
                out.push(angle.cos());
            } else {
                out.push(value);
            }
        }
        Ok(out)
    }
}

impl<E: Env> Env for DatetimeWrapper<E> {
    fn reset(&mut self) -> Result<(Observation, Info), EnvError> {
        let (raw, info) = self.inner.reset()?;
        Ok((self.encode(&raw)?, info))
    }

    fn step(&mut self, action: Action) -> Result<Step, EnvError> {
        let mut step = self.inner.step(action)?;
        step.observation = self.encode(&step.observation)?;
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
