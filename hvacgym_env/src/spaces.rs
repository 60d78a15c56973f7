//! Action spaces.

use crate::types::Action;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// The set of actions an environment accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionSpace {
    /// Actions `0..n`
    Discrete { n: usize },

    /// Setpoint vectors bounded per dimension (inclusive)
    Continuous { low: Vec<f64>, high: Vec<f64> },
}

impl ActionSpace {
    /// Whether `action` belongs to this space.
    pub fn contains(&self, action: &Action) -> bool {
        match (self, action) {
            (ActionSpace::Discrete { n }, Action::Discrete(i)) => i < n,
            (ActionSpace::Continuous { low, high }, Action::Continuous(values)) => {
                values.len() == low.len()
                    && values
                        .iter()
                        .zip(low.iter().zip(high.iter()))
                        .all(|(v, (lo, hi))| v >= lo && v <= hi)
            }
            _ => false,
        }
    }

    /// Draws a uniformly random action.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Action {
        match self {
            ActionSpace::Discrete { n } => Action::Discrete(rng.gen_range(0..*n)),
            ActionSpace::Continuous { low, high } => Action::Continuous(
                low.iter()
                    .zip(high.iter())
                    .map(|(lo, hi)| if lo < hi { rng.gen_range(*lo..=*hi) } else { *lo })
                    .collect(),
            ),
        }
    }

    /// Number of discrete actions, or the setpoint dimension.
    pub fn dim(&self) -> usize {
        match self {
            ActionSpace::Discrete { n } => *n,
            ActionSpace::Continuous { low, .. } => low.len(),
        }
    }

    pub fn is_discrete(&self) -> bool {
        matches!(self, ActionSpace::Discrete { .. })
    }
}
