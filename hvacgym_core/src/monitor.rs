//! Episode monitor - CSV step and progress logs.
//!
//! Files are opened in append mode and get their header only when empty,
//! so a reopened file is never truncated. Every row is flushed as soon as
//! it is written.
//!
//! | File | Location | Rows |
//! |------|----------|------|
//! | `progress.csv` | run directory | one per finished episode |
//! | `monitor.csv` | episode directory | reset row + one per step |
//! | `monitor_normalized.csv` | episode directory | same, normalized values |

use hvacgym_env::{EnvError, Info};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

pub const PROGRESS_FILE: &str = "progress.csv";
pub const MONITOR_FILE: &str = "monitor.csv";
pub const MONITOR_NORMALIZED_FILE: &str = "monitor_normalized.csv";

/// Name of the reward term logged as power penalty
pub const POWER_PENALTY_TERM: &str = "reward_energy";

/// Name of the reward term logged as comfort penalty
pub const COMFORT_PENALTY_TERM: &str = "reward_comfort";

pub const PROGRESS_HEADER: [&str; 12] = [
    "episode_num",
    "cumulative_reward",
    "mean_reward",
    "cumulative_power_consumption",
    "mean_power_consumption",
    "cumulative_comfort_penalty",
    "mean_comfort_penalty",
    "cumulative_power_penalty",
    "mean_power_penalty",
    "comfort_violation (%)",
    "length(timesteps)",
    "time_elapsed(seconds)",
];

/// Columns after the observation and action variables
const MONITOR_TRAILER: [&str; 7] = [
    "time (seconds)",
    "reward",
    "power_penalty",
    "comfort_penalty",
    "abs_comfort",
    "terminated",
    "truncated",
];

pub(crate) fn csv_error(err: csv::Error) -> EnvError {
    EnvError::Csv(err.to_string())
}

/// Header of a step log.
pub fn monitor_header(observation_variables: &[String], action_variables: &[String]) -> Vec<String> {
    std::iter::once("timestep".to_string())
        .chain(observation_variables.iter().cloned())
        .chain(action_variables.iter().cloned())
        .chain(MONITOR_TRAILER.iter().map(|s| s.to_string()))
        .collect()
}

/// An append-only CSV file with a fixed header.
pub struct CsvLog {
    path: PathBuf,
    columns: usize,
    writer: csv::Writer<File>,
}

impl CsvLog {
    /// Opens (or creates) `path`, writing `header` if the file is empty.
    pub fn open<S: AsRef<str>>(path: impl Into<PathBuf>, header: &[S]) -> Result<Self, EnvError> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let empty = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if empty {
            writer
                .write_record(header.iter().map(|h| h.as_ref()))
                .map_err(csv_error)?;
            writer.flush()?;
        }

        Ok(Self {
            path,
            columns: header.len(),
            writer,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one row and flushes it.
    pub fn write_row(&mut self, row: &[String]) -> Result<(), EnvError> {
        if row.len() != self.columns {
            return Err(EnvError::Csv(format!(
                "{}: row has {} cells, header has {}",
                self.path.display(),
                row.len(),
                self.columns
            )));
        }
        self.writer.write_record(row).map_err(csv_error)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Row written right after reset (action cells empty).
pub fn reset_row(observation: &[f64], action_count: usize, info: &Info) -> Vec<String> {
    let mut row = Vec::with_capacity(1 + observation.len() + action_count + MONITOR_TRAILER.len());
    row.push(info.timestep.to_string());
    row.extend(observation.iter().map(f64::to_string));
    row.extend(std::iter::repeat(String::new()).take(action_count));
    row.push(info.time_elapsed.to_string());
    row.extend(std::iter::repeat(String::new()).take(4));
    row.push(false.to_string());
    row.push(false.to_string());
    row
}

/// Row written after a step.
pub fn step_row(observation: &[f64], info: &Info, terminated: bool, truncated: bool) -> Vec<String> {
    let optional = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();

    let mut row = Vec::with_capacity(1 + observation.len() + info.action.len() + MONITOR_TRAILER.len());
    row.push(info.timestep.to_string());
    row.extend(observation.iter().map(f64::to_string));
    row.extend(info.action.iter().map(f64::to_string));
    row.push(info.time_elapsed.to_string());
    row.push(info.reward.to_string());
    row.push(optional(info.reward_term(POWER_PENALTY_TERM)));
    row.push(optional(info.reward_term(COMFORT_PENALTY_TERM)));
    row.push(info.abs_comfort.to_string());
    row.push(terminated.to_string());
    row.push(truncated.to_string());
    row
}

/// Running aggregates of one episode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpisodeSummary {
    pub episode: u32,
    pub length: u64,
    pub time_elapsed: u64,
    pub cumulative_reward: f64,
    pub cumulative_power: f64,
    pub cumulative_comfort_penalty: f64,
    pub cumulative_power_penalty: f64,

    /// Steps with a non-zero comfort violation
    pub comfort_violations: u64,
}

impl EpisodeSummary {
    pub fn new(episode: u32) -> Self {
        Self {
            episode,
            ..Default::default()
        }
    }

    /// Adds one step.
    pub fn record(&mut self, info: &Info) {
        self.length += 1;
        self.time_elapsed = info.time_elapsed;
        self.cumulative_reward += info.reward;
        self.cumulative_power += info.total_power;
        self.cumulative_comfort_penalty += info.reward_term(COMFORT_PENALTY_TERM).unwrap_or(0.0);
        self.cumulative_power_penalty += info.reward_term(POWER_PENALTY_TERM).unwrap_or(0.0);
        if info.abs_comfort > 0.0 {
            self.comfort_violations += 1;
        }
    }

    fn mean(&self, total: f64) -> f64 {
        if self.length == 0 {
            0.0
        } else {
            total / self.length as f64
        }
    }

    /// Percentage of steps outside the comfort range.
    pub fn comfort_violation_pct(&self) -> f64 {
        self.mean(self.comfort_violations as f64) * 100.0
    }

    /// Row for `progress.csv`.
    pub fn progress_row(&self) -> Vec<String> {
        vec![
            self.episode.to_string(),
            self.cumulative_reward.to_string(),
            self.mean(self.cumulative_reward).to_string(),
            self.cumulative_power.to_string(),
            self.mean(self.cumulative_power).to_string(),
            self.cumulative_comfort_penalty.to_string(),
            self.mean(self.cumulative_comfort_penalty).to_string(),
            self.cumulative_power_penalty.to_string(),
            self.mean(self.cumulative_power_penalty).to_string(),
            self.comfort_violation_pct().to_string(),
            self.length.to_string(),
            self.time_elapsed.to_string(),
        ]
    }
}
