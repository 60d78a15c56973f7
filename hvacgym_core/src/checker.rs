//! Environment checker - contract smoke test for any pipeline.
//!
//! Runs a reset plus a few randomly sampled steps and verifies the
//! step/reset contract at the outermost element:
//!
//! - observation length equals the advertised schema length
//! - reset info is non-empty and carries the configuration echo
//! - `timestep` counts steps and `time_elapsed == timestep * step_size`
//! - the reward matches the advertised arity
//! - sampled actions lie in the advertised action space
//!
//! The first breach is reported as `EnvError::Configuration`.

use hvacgym_env::{Env, EnvError, Info};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Steps taken by [`check_env`]
pub const CHECK_STEPS: u64 = 4;

// =============================================================================
// CHECKS
// =============================================================================

fn breach(msg: String) -> EnvError {
    EnvError::configuration(format!("env check failed: {}", msg))
}

fn check_observation(env: &dyn Env, observation: &[f64], when: &str) -> Result<(), EnvError> {
    let expected = env.observation_schema().len();
    if observation.len() != expected {
        return Err(breach(format!(
            "{} observation has {} values, schema has {}",
            when,
            observation.len(),
            expected
        )));
    }
    Ok(())
}

fn check_reset_info(info: &Info) -> Result<(), EnvError> {
    if info.is_empty() {
        return Err(breach("reset info is empty".to_string()));
    }
    if info.config.is_none() {
        return Err(breach("reset info lacks the configuration echo".to_string()));
    }
    if info.timestep != 0 || info.time_elapsed != 0 {
        return Err(breach(format!(
            "reset info reports timestep {} / time_elapsed {}",
            info.timestep, info.time_elapsed
        )));
    }
    Ok(())
}

// =============================================================================
// ENTRY POINT
// =============================================================================

/// Checks `env` with actions sampled from a seeded generator.
///
/// The episode is left open; the caller decides whether to reset or close.
pub fn check_env(env: &mut dyn Env, seed: u64) -> Result<(), EnvError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let (observation, info) = env.reset()?;
    check_observation(env, &observation, "reset")?;
    check_reset_info(&info)?;

    let mut step_size = None;
    for k in 1..=CHECK_STEPS {
        let action = env.action_space().sample(&mut rng);
        if !env.action_space().contains(&action) {
            return Err(breach(format!("sampled action {:?} is outside the space", action)));
        }

        let step = env.step(action)?;
        check_observation(env, &step.observation, "step")?;

        if !env.reward_arity().matches(&step.reward) {
            return Err(breach(format!(
                "reward {:?} does not match arity {:?}",
                step.reward,
                env.reward_arity()
            )));
        }
        if step.info.timestep != k {
            return Err(breach(format!(
                "timestep is {} after {} step(s)",
                step.info.timestep, k
            )));
        }
        if step.info.action.is_empty() {
            return Err(breach("step info lacks the applied action".to_string()));
        }

        let size = *step_size.get_or_insert(step.info.time_elapsed);
        if step.info.time_elapsed != size * k {
            return Err(breach(format!(
                "time_elapsed is {} after {} step(s) of {}s",
                step.info.time_elapsed, k, size
            )));
        }

        if step.done() {
            break;
        }
    }

    debug!("Env check passed (seed {})", seed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::calendar_env;
    use crate::wrappers::{MultiObjectiveReward, MultiObsWrapper};

    #[test]
    fn test_scripted_env_passes() {
        let mut env = MultiObsWrapper::new(calendar_env(), 2).unwrap();
        check_env(&mut env, 7).unwrap();
    }

    #[test]
    fn test_vector_reward_passes() {
        let terms = vec!["reward_energy".to_string(), "reward_comfort".to_string()];
        let mut env = MultiObjectiveReward::new(calendar_env(), terms).unwrap();
        check_env(&mut env, 7).unwrap();
    }

    #[test]
    fn test_short_episode_passes() {
        let mut env = calendar_env();
        env.episode_length = Some(2);
        check_env(&mut env, 1).unwrap();
        assert_eq!(env.actions.len(), 2);
    }
}
