//! Episode logging wrapper.

use crate::monitor::{
    monitor_header, reset_row, step_row, CsvLog, EpisodeSummary, MONITOR_FILE,
    MONITOR_NORMALIZED_FILE, PROGRESS_FILE, PROGRESS_HEADER,
};
use hvacgym_env::{
    Action, ActionSpace, Env, EnvError, Info, Observation, ObservationSchema, RewardArity, Step,
};
use std::path::Path;
use tracing::{debug, warn};

/// Writes the step and progress logs of every episode that passes through.
///
/// `monitor.csv` receives raw values. When a normalization wrapper sits
/// inside this one, the normalized values go to `monitor_normalized.csv`.
pub struct LoggerWrapper<E: Env> {
    inner: E,
    active: bool,
    observation_len: usize,
    header: Vec<String>,
    progress: Option<CsvLog>,
    monitor: Option<CsvLog>,
    monitor_normalized: Option<CsvLog>,
    raw_mismatch_reported: bool,

    /// Aggregates of the episode being logged
    summary: Option<EpisodeSummary>,
}

impl<E: Env> LoggerWrapper<E> {
    pub fn new(inner: E) -> Self {
        let header = monitor_header(inner.observation_schema().names(), inner.action_variables());
        Self {
            observation_len: inner.observation_schema().len(),
            inner,
            active: true,
            header,
            progress: None,
            monitor: None,
            monitor_normalized: None,
            raw_mismatch_reported: false,
            summary: None,
        }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// Resumes logging from the next record.
    pub fn activate(&mut self) {
        self.active = true;
    }

    /// Suspends logging from the next record. Written files stay as they are.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Aggregates of the episode in progress.
    pub fn summary(&self) -> Option<&EpisodeSummary> {
        self.summary.as_ref()
    }

    /// Raw observation matching this wrapper's schema, if a normalization
    /// wrapper provides one.
    fn raw_observation(&mut self) -> Option<Observation> {
        let raw = self.inner.unwrapped_observation()?;
        if raw.len() == self.observation_len {
            return Some(raw.to_vec());
        }
        if !self.raw_mismatch_reported {
            self.raw_mismatch_reported = true;
            warn!(
                "Raw observation has {} values, the logged schema has {}; {} gets the wrapped values",
                raw.len(),
                self.observation_len,
                MONITOR_FILE
            );
        }
        None
    }

    fn flush_progress(&mut self) -> Result<(), EnvError> {
        if let Some(summary) = self.summary.take() {
            if let (true, Some(progress)) = (self.active, self.progress.as_mut()) {
                progress.write_row(&summary.progress_row())?;
                debug!(
                    "Logged episode {} ({} steps) to {}",
                    summary.episode,
                    summary.length,
                    progress.path().display()
                );
            }
        }
        Ok(())
    }

    fn open_episode_logs(&mut self, info: &Info, normalized: bool) -> Result<(), EnvError> {
        let working_dir = info.working_dir.as_deref().ok_or_else(|| {
            EnvError::configuration("LoggerWrapper needs reset info with a working directory")
        })?;
        let run_dir = info
            .run_dir
            .as_deref()
            .or_else(|| working_dir.parent())
            .unwrap_or(Path::new("."));

        if self.progress.is_none() {
            self.progress = Some(CsvLog::open(run_dir.join(PROGRESS_FILE), &PROGRESS_HEADER)?);
        }
        self.monitor = Some(CsvLog::open(working_dir.join(MONITOR_FILE), &self.header)?);
        self.monitor_normalized = if normalized {
            Some(CsvLog::open(
                working_dir.join(MONITOR_NORMALIZED_FILE),
                &self.header,
            )?)
        } else {
            None
        };
        Ok(())
    }
}

impl<E: Env> Env for LoggerWrapper<E> {
    fn reset(&mut self) -> Result<(Observation, Info), EnvError> {
        self.flush_progress()?;

        let (observation, info) = self.inner.reset()?;
        let raw = self.raw_observation();
        self.open_episode_logs(&info, raw.is_some())?;
        self.summary = Some(EpisodeSummary::new(info.episode));

        if self.active {
            let actions = self.inner.action_variables().len();
            let logged = raw.as_deref().unwrap_or(&observation);
            if let Some(monitor) = self.monitor.as_mut() {
                monitor.write_row(&reset_row(logged, actions, &info))?;
            }
            if let Some(normalized) = self.monitor_normalized.as_mut() {
                normalized.write_row(&reset_row(&observation, actions, &info))?;
            }
        }

        Ok((observation, info))
    }

    fn step(&mut self, action: Action) -> Result<Step, EnvError> {
        let step = self.inner.step(action)?;
        if !self.active {
            return Ok(step);
        }

        let raw = self.raw_observation();
        let logged = raw.as_deref().unwrap_or(&step.observation);
        if let Some(monitor) = self.monitor.as_mut() {
            monitor.write_row(&step_row(logged, &step.info, step.terminated, step.truncated))?;
        }
        if let Some(normalized) = self.monitor_normalized.as_mut() {
            normalized.write_row(&step_row(
                &step.observation,
                &step.info,
                step.terminated,
                step.truncated,
            ))?;
        }
        if let Some(summary) = self.summary.as_mut() {
            summary.record(&step.info);
        }

        Ok(step)
    }

    fn close(&mut self) -> Result<(), EnvError> {
        let logged = self.flush_progress();
        self.monitor = None;
        self.monitor_normalized = None;
        self.inner.close()?;
        logged
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
        self.inner.unwrapped_observation()
    }
}
