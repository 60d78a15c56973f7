//! Simulation bridge against the mock engine.

mod common;

use common::{crashing_config, mock_config, scripted_config, state_frame, STEPS_PER_DAY};
use hvacgym_core::supervisor::ENGINE_STDERR_FILE;
use hvacgym_core::{check_env, BridgeState, EnvironmentId, RewardConfig, SimulationBridge};
use hvacgym_env::{Action, Env, EnvError, Reward};

/// Engine values of the demo preset (its observation minus the calendar)
const DEMO_VALUES: usize = 16;

fn bridge(root: &std::path::Path, id: EnvironmentId) -> SimulationBridge {
    SimulationBridge::with_reward_config(mock_config(root, id), &RewardConfig::five_zone()).unwrap()
}

#[test]
fn test_reset_step_close_lifecycle() {
    let root = tempfile::tempdir().unwrap();
    let mut env = bridge(root.path(), EnvironmentId::Demo);
    assert_eq!(env.state(), BridgeState::Uninitialized);
    assert!(!env.episode_existed());

    let (observation, info) = env.reset().unwrap();
    assert_eq!(env.state(), BridgeState::Ready);
    assert_eq!(observation.len(), 20);
    assert_eq!(&observation[..4], &[1991.0, 1.0, 1.0, 0.0]);
    assert_eq!(info.episode, 1);
    assert!(info.config.is_some());

    let working_dir = info.working_dir.clone().unwrap();
    assert_eq!(working_dir, env.run_dir().join("episode-1"));
    assert!(working_dir.join(ENGINE_STDERR_FILE).exists());
    assert!(env
        .run_dir()
        .file_name()
        .unwrap()
        .to_string_lossy()
        .ends_with("-res1"));

    env.step(Action::Discrete(0)).unwrap();
    assert_eq!(env.state(), BridgeState::Stepping);
    assert!(env.episode_existed());

    env.close().unwrap();
    assert_eq!(env.state(), BridgeState::Closed);
    env.close().unwrap();
    assert!(matches!(env.step(Action::Discrete(0)), Err(EnvError::InvalidState(_))));
}

#[test]
fn test_four_steps_of_action_zero() {
    let root = tempfile::tempdir().unwrap();
    let mut env = bridge(root.path(), EnvironmentId::Demo);

    let (_, info) = env.reset().unwrap();
    assert_eq!(info.timestep, 0);
    assert_eq!(info.time_elapsed, 0);

    for k in 1..=4u64 {
        let step = env.step(Action::Discrete(0)).unwrap();
        assert_eq!(step.observation.len(), env.observation_schema().len());
        assert!(matches!(step.reward, Reward::Scalar(r) if r.is_finite()));
        assert!(!step.terminated);
        assert!(!step.truncated);
        assert_eq!(step.info.timestep, k);
        assert_eq!(step.info.time_elapsed, k * 900);
    }
    assert_eq!(env.timestep(), 4);
    assert_eq!(env.time_elapsed(), 3600);
    env.close().unwrap();
}

#[test]
fn test_step_info_carries_reward_breakdown() {
    let root = tempfile::tempdir().unwrap();
    let mut env = bridge(root.path(), EnvironmentId::FiveZoneHotContinuous);
    env.reset().unwrap();

    let step = env.step(Action::Continuous(vec![21.0, 25.0])).unwrap();
    assert_eq!(step.info.action, vec![21.0, 25.0]);
    assert!(step.info.total_power > 0.0);
    assert!(step.info.reward_term("reward_energy").is_some());
    assert!(step.info.reward_term("reward_comfort").is_some());
    assert_eq!(step.reward, Reward::Scalar(step.info.reward));

    // The engine reports the setpoints it received
    let schema = env.observation_schema();
    let heating = schema
        .index_of("Zone Thermostat Heating Setpoint Temperature(SPACE1-1)")
        .unwrap();
    assert_eq!(step.observation[heating], 21.0);
}

#[test]
fn test_run_period_end_terminates() {
    let root = tempfile::tempdir().unwrap();
    let mut env = bridge(root.path(), EnvironmentId::Demo);
    env.reset().unwrap();

    let mut last = None;
    for _ in 0..STEPS_PER_DAY {
        last = Some(env.step(Action::Discrete(1)).unwrap());
    }
    let last = last.unwrap();
    assert!(last.terminated);
    assert!(!last.truncated);
    assert_eq!(last.info.time_elapsed, 86_400);
    assert_eq!(env.state(), BridgeState::Terminated);
    assert!(matches!(env.step(Action::Discrete(1)), Err(EnvError::InvalidState(_))));

    // A new episode starts in a new directory
    let (_, info) = env.reset().unwrap();
    assert_eq!(info.episode, 2);
    assert!(env.run_dir().join("episode-2").is_dir());
}

#[test]
fn test_max_episode_steps_truncates() {
    let root = tempfile::tempdir().unwrap();
    let config = mock_config(root.path(), EnvironmentId::Demo).with_max_episode_steps(3);
    let mut env = SimulationBridge::with_reward_config(config, &RewardConfig::five_zone()).unwrap();
    env.reset().unwrap();

    assert!(!env.step(Action::Discrete(0)).unwrap().done());
    assert!(!env.step(Action::Discrete(0)).unwrap().done());
    let step = env.step(Action::Discrete(0)).unwrap();
    assert!(step.truncated);
    assert!(!step.terminated);
    assert_eq!(env.state(), BridgeState::Terminated);
}

#[test]
fn test_engine_crash_is_detected() {
    let root = tempfile::tempdir().unwrap();
    let config = crashing_config(root.path(), EnvironmentId::Demo, 2);
    let mut env = SimulationBridge::with_reward_config(config, &RewardConfig::five_zone()).unwrap();
    env.reset().unwrap();

    env.step(Action::Discrete(0)).unwrap();
    let err = env.step(Action::Discrete(0)).unwrap_err();
    assert!(matches!(err, EnvError::SimulationCrashed(_)), "{:?}", err);
    assert!(err.requires_reset());
    assert_eq!(env.state(), BridgeState::Terminated);

    // The engine's stderr stays in the episode directory
    let stderr = std::fs::read_to_string(env.run_dir().join("episode-1").join(ENGINE_STDERR_FILE))
        .unwrap();
    assert!(stderr.contains("Injected crash"));

    // Recovery is a fresh episode
    env.reset().unwrap();
    env.step(Action::Discrete(0)).unwrap();
    env.close().unwrap();
    env.close().unwrap();
}

#[test]
fn test_invalid_actions_are_rejected_without_killing_the_episode() {
    let root = tempfile::tempdir().unwrap();
    let mut env = bridge(root.path(), EnvironmentId::Demo);
    env.reset().unwrap();

    assert!(matches!(env.step(Action::Discrete(10)), Err(EnvError::InvalidAction(_))));
    assert!(matches!(
        env.step(Action::Continuous(vec![21.0, 25.0])),
        Err(EnvError::InvalidAction(_))
    ));
    let step = env.step(Action::Discrete(9)).unwrap();
    assert_eq!(step.info.timestep, 1);
}

#[test]
fn test_bridges_never_share_a_run_directory() {
    let root = tempfile::tempdir().unwrap();
    let first = bridge(root.path(), EnvironmentId::Demo);
    let second = bridge(root.path(), EnvironmentId::Demo);
    assert_ne!(first.run_dir(), second.run_dir());
    assert_ne!(first.run_id(), second.run_id());
}

#[test]
fn test_check_env_passes_on_every_preset() {
    for id in EnvironmentId::all() {
        let root = tempfile::tempdir().unwrap();
        let mut env = bridge(root.path(), id);
        check_env(&mut env, 11).unwrap();
        env.close().unwrap();
    }
}

/// Bridge on `sh -c` answering episode 1 with `first` and later episodes
/// with a valid handshake; every episode then echoes one `reply` per
/// request.
fn scripted_bridge(root: &std::path::Path, first: &str, reply: &str) -> SimulationBridge {
    let good = state_frame("0", DEMO_VALUES, "20");
    let script = format!(
        "case \"$HVACGYM_WORKING_DIR\" in *episode-1) echo \"{}\";; *) echo \"{}\";; esac; \
         while read line; do echo \"{}\"; done",
        first, good, reply
    );
    let config = scripted_config(root, EnvironmentId::Demo, &script);
    SimulationBridge::with_reward_config(config, &RewardConfig::five_zone()).unwrap()
}

fn assert_aborted(env: &SimulationBridge, err: &EnvError) {
    assert!(matches!(err, EnvError::Protocol(_)), "{:?}", err);
    assert!(err.requires_reset());
    assert_eq!(env.state(), BridgeState::Terminated);
    assert_eq!(env.engine_pid(), None);
}

#[test]
fn test_handshake_with_wrong_value_count_is_a_protocol_error() {
    let root = tempfile::tempdir().unwrap();
    let short = state_frame("0", DEMO_VALUES - 1, "20");
    let mut env = scripted_bridge(root.path(), &short, &state_frame("900", DEMO_VALUES, "20"));

    let err = env.reset().unwrap_err();
    assert_aborted(&env, &err);
    assert!(matches!(env.step(Action::Discrete(0)), Err(EnvError::InvalidState(_))));

    // The next episode starts cleanly
    let (observation, info) = env.reset().unwrap();
    assert_eq!(info.episode, 2);
    assert_eq!(observation.len(), 20);
    assert_eq!(env.state(), BridgeState::Ready);
    env.step(Action::Discrete(0)).unwrap();
    env.close().unwrap();
}

#[test]
fn test_sim_time_beyond_the_calendar_is_a_protocol_error() {
    let root = tempfile::tempdir().unwrap();
    let huge = state_frame("1e17", DEMO_VALUES, "20");
    let mut env = scripted_bridge(root.path(), &huge, &state_frame("900", DEMO_VALUES, "20"));

    let err = env.reset().unwrap_err();
    assert_aborted(&env, &err);

    env.reset().unwrap();
    env.step(Action::Discrete(0)).unwrap();
    env.close().unwrap();
}

#[test]
fn test_huge_sim_time_mid_episode_is_a_protocol_error() {
    let root = tempfile::tempdir().unwrap();
    let good = state_frame("0", DEMO_VALUES, "20");
    let mut env = scripted_bridge(root.path(), &good, &state_frame("1e17", DEMO_VALUES, "20"));

    env.reset().unwrap();
    let err = env.step(Action::Discrete(0)).unwrap_err();
    assert_aborted(&env, &err);
}

#[test]
fn test_non_numeric_value_mid_episode_is_a_protocol_error() {
    let root = tempfile::tempdir().unwrap();
    let good = state_frame("0", DEMO_VALUES, "20");
    let garbled = state_frame("900", DEMO_VALUES, "abc");
    let mut env = scripted_bridge(root.path(), &good, &garbled);

    env.reset().unwrap();
    let pid = env.engine_pid().unwrap();
    let err = env.step(Action::Discrete(0)).unwrap_err();
    assert_aborted(&env, &err);
    assert_eq!(env.timestep(), 0);
    #[cfg(target_os = "linux")]
    assert!(common::process_gone(pid));

    let (_, info) = env.reset().unwrap();
    assert_eq!(info.episode, 2);
    assert!(env.engine_pid().is_some());
    env.close().unwrap();
}

#[cfg(target_os = "linux")]
#[test]
fn test_reset_mid_episode_stops_the_previous_engine() {
    let root = tempfile::tempdir().unwrap();
    let mut env = bridge(root.path(), EnvironmentId::Demo);

    env.reset().unwrap();
    env.step(Action::Discrete(0)).unwrap();
    let first = env.engine_pid().unwrap();
    assert!(!common::process_gone(first));

    env.reset().unwrap();
    let second = env.engine_pid().unwrap();
    assert_ne!(first, second);
    assert!(common::process_gone(first));

    env.close().unwrap();
    assert_eq!(env.engine_pid(), None);
    assert!(common::process_gone(second));
}
