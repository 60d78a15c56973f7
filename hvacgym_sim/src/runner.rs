//! Episode runner - drives a pipeline with an agent.

use crate::agent::Agent;
use crate::exporter::StepFrame;
use hvacgym_core::monitor::EpisodeSummary;
use hvacgym_env::{Env, EnvError, Info};
use tracing::{debug, info, warn};

/// Simulated seconds between progress lines
const SECONDS_PER_DAY: u64 = 86_400;

/// Whether the step closed a simulated day.
fn ends_day(info: &Info) -> bool {
    info.timestep > 0 && info.time_elapsed % SECONDS_PER_DAY == 0
}

/// Results from running one episode.
#[derive(Debug, Clone, Default)]
pub struct EpisodeResult {
    /// Episode number reported by the environment
    pub episode: u32,

    /// Steps taken
    pub steps: u64,

    /// Simulated seconds at the last step
    pub time_elapsed: u64,

    pub total_reward: f64,
    pub mean_reward: f64,

    /// Mean HVAC demand (W)
    pub mean_power: f64,

    /// Percentage of steps outside the comfort range
    pub comfort_violation_pct: f64,

    pub terminated: bool,
    pub truncated: bool,

    /// Error that ended the episode, if any
    pub failure_reason: Option<String>,

    /// Per-step records, filled when recording is on
    pub frames: Vec<StepFrame>,
}

impl EpisodeResult {
    pub fn new(episode: u32) -> Self {
        Self {
            episode,
            ..Default::default()
        }
    }

    /// Whether the episode ended without error.
    pub fn passed(&self) -> bool {
        self.failure_reason.is_none()
    }

    fn finish(&mut self, summary: &EpisodeSummary) {
        self.steps = summary.length;
        self.time_elapsed = summary.time_elapsed;
        self.total_reward = summary.cumulative_reward;
        if summary.length > 0 {
            let n = summary.length as f64;
            self.mean_reward = summary.cumulative_reward / n;
            self.mean_power = summary.cumulative_power / n;
        }
        self.comfort_violation_pct = summary.comfort_violation_pct();
    }
}

/// Runs episodes back to back on one environment.
pub struct EpisodeRunner {
    /// Number of episodes
    episodes: u32,

    /// Keep a [`StepFrame`] per step
    record: bool,
}

impl EpisodeRunner {
    pub fn new(episodes: u32) -> Self {
        Self {
            episodes,
            record: false,
        }
    }

    /// Sets whether step frames are recorded.
    pub fn with_recording(mut self, record: bool) -> Self {
        self.record = record;
        self
    }

    /// Runs every episode, then closes the environment.
    ///
    /// A failed episode is reported in its result and the next one starts
    /// with a fresh reset.
    pub fn run(&self, env: &mut dyn Env, agent: &mut dyn Agent) -> Vec<EpisodeResult> {
        let mut results = Vec::with_capacity(self.episodes as usize);

        for n in 1..=self.episodes {
            let result = self.run_episode(env, agent, n);
            match &result.failure_reason {
                None => info!(
                    "Episode {}: {} steps, reward {:.3}, mean power {:.1} W, comfort violation {:.1}%",
                    result.episode,
                    result.steps,
                    result.total_reward,
                    result.mean_power,
                    result.comfort_violation_pct
                ),
                Some(reason) => warn!("Episode {} failed: {}", result.episode, reason),
            }
            results.push(result);
        }

        if let Err(e) = env.close() {
            warn!("Closing the environment failed: {}", e);
        }
        results
    }

    fn run_episode(&self, env: &mut dyn Env, agent: &mut dyn Agent, n: u32) -> EpisodeResult {
        let mut result = EpisodeResult::new(n);
        let mut summary = EpisodeSummary::new(n);

        if let Err(e) = self.drive(env, agent, &mut result, &mut summary) {
            result.failure_reason = Some(e.to_string());
        }
        result.finish(&summary);
        result
    }

    fn drive(
        &self,
        env: &mut dyn Env,
        agent: &mut dyn Agent,
        result: &mut EpisodeResult,
        summary: &mut EpisodeSummary,
    ) -> Result<(), EnvError> {
        let (mut observation, info) = env.reset()?;
        result.episode = info.episode;
        summary.episode = info.episode;

        loop {
            let action = agent.act(env.action_space(), &observation);
            let step = env.step(action)?;

            summary.record(&step.info);
            if self.record {
                result.frames.push(StepFrame::from_step(&step));
            }
            if ends_day(&step.info) {
                debug!(
                    "  episode {} t={}s reward={:.3}",
                    result.episode,
                    step.info.time_elapsed,
                    step.reward.total()
                );
            }

            if step.done() {
                result.terminated = step.terminated;
                result.truncated = step.truncated;
                return Ok(());
            }
            observation = step.observation;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn after(timestep: u64, step_size: u64) -> Info {
        Info {
            timestep,
            time_elapsed: timestep * step_size,
            ..Default::default()
        }
    }

    #[test]
    fn test_day_boundary_follows_step_size() {
        assert!(ends_day(&after(96, 900)));
        assert!(!ends_day(&after(95, 900)));
        assert!(ends_day(&after(24, 3600)));
        assert!(!ends_day(&after(12, 3600)));
        assert!(ends_day(&after(288, 300)));
        assert!(!ends_day(&after(96, 300)));
        assert!(!ends_day(&after(0, 900)));
    }
}
