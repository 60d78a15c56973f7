//! JSON export of a run.
//!
//! One record per step, grouped by episode, for offline plotting.

use crate::runner::EpisodeResult;
use hvacgym_env::Step;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A single step of an episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepFrame {
    pub timestep: u64,

    /// Simulated seconds since reset
    pub time_elapsed: u64,

    /// Setpoints applied
    pub action: Vec<f64>,

    pub reward: f64,

    /// Reward vector, when the pipeline produces one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_vector: Option<Vec<f64>>,

    pub total_power: f64,
    pub abs_comfort: f64,
    pub observation: Vec<f64>,
}

impl StepFrame {
    pub fn from_step(step: &Step) -> Self {
        Self {
            timestep: step.info.timestep,
            time_elapsed: step.info.time_elapsed,
            action: step.info.action.clone(),
            reward: step.reward.total(),
            reward_vector: step.reward.as_vector().map(<[f64]>::to_vec),
            total_power: step.info.total_power,
            abs_comfort: step.info.abs_comfort,
            observation: step.observation.clone(),
        }
    }
}

/// Summary and frames of one episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeExport {
    pub episode: u32,
    pub steps: u64,
    pub total_reward: f64,
    pub terminated: bool,
    pub truncated: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    pub frames: Vec<StepFrame>,
}

/// Complete run export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunExport {
    /// Environment name
    pub env: String,

    pub agent: String,
    pub seed: u64,

    /// Observation field names, matching `StepFrame::observation`
    pub observation_names: Vec<String>,

    pub episodes: Vec<EpisodeExport>,

    /// Whether every episode finished without error
    pub passed: bool,
}

impl RunExport {
    pub fn new(env: &str, agent: &str, seed: u64, observation_names: Vec<String>) -> Self {
        Self {
            env: env.to_string(),
            agent: agent.to_string(),
            seed,
            observation_names,
            episodes: Vec::new(),
            passed: true,
        }
    }

    /// Adds an episode; its frames move into the export.
    pub fn add_episode(&mut self, result: &mut EpisodeResult) {
        self.passed &= result.passed();
        self.episodes.push(EpisodeExport {
            episode: result.episode,
            steps: result.steps,
            total_reward: result.total_reward,
            terminated: result.terminated,
            truncated: result.truncated,
            failure_reason: result.failure_reason.clone(),
            frames: std::mem::take(&mut result.frames),
        });
    }

    /// Number of step frames over all episodes.
    pub fn frame_count(&self) -> usize {
        self.episodes.iter().map(|e| e.frames.len()).sum()
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
