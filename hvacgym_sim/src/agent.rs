//! Controllers that pick the next action of an episode.

use hvacgym_env::{Action, ActionSpace, EnvError};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Chooses actions from the current observation.
pub trait Agent {
    /// Short name used in summaries and exports.
    fn name(&self) -> &str;

    fn act(&mut self, space: &ActionSpace, observation: &[f64]) -> Action;
}

/// Uniform samples from the action space, reproducible per seed.
pub struct RandomAgent {
    rng: ChaCha8Rng,
}

impl RandomAgent {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Agent for RandomAgent {
    fn name(&self) -> &str {
        "random"
    }

    fn act(&mut self, space: &ActionSpace, _observation: &[f64]) -> Action {
        space.sample(&mut self.rng)
    }
}

/// Repeats one action forever.
pub struct ConstantAgent {
    action: Action,
}

impl ConstantAgent {
    pub fn new(action: Action) -> Self {
        Self { action }
    }

    /// Picks action `index` of a discrete space, or the setpoints halfway
    /// between the bounds of a continuous one.
    pub fn for_space(space: &ActionSpace, index: usize) -> Result<Self, EnvError> {
        let action = match space {
            ActionSpace::Discrete { n } if index < *n => Action::Discrete(index),
            ActionSpace::Discrete { n } => {
                return Err(EnvError::invalid_action(format!(
                    "action {} is outside Discrete({})",
                    index, n
                )))
            }
            ActionSpace::Continuous { low, high } => Action::Continuous(
                low.iter().zip(high).map(|(lo, hi)| (lo + hi) / 2.0).collect(),
            ),
        };
        Ok(Self::new(action))
    }
}

impl Agent for ConstantAgent {
    fn name(&self) -> &str {
        "constant"
    }

    fn act(&mut self, _space: &ActionSpace, _observation: &[f64]) -> Action {
        self.action.clone()
    }
}
