//! Wrappers stacked on a real bridge driven by the mock engine.

mod common;

use common::{crashing_config, lines, mock_config};
use hvacgym_core::monitor::{MONITOR_FILE, MONITOR_NORMALIZED_FILE, PROGRESS_FILE};
use hvacgym_core::wrappers::{
    DatetimeWrapper, DiscreteIncrementalWrapper, LoggerWrapper, MultiObjectiveReward,
    MultiObsWrapper, NormalizeObservation, PreviousObservationWrapper, RangeTable,
};
use hvacgym_core::{
    build_pipeline, check_env, EnvironmentId, PipelineConfig, RewardConfig, SimulationBridge,
    WrapperConfig,
};
use hvacgym_env::{Action, ActionSpace, Env, Reward};
use std::path::Path;

const ZONE_TEMPERATURE: &str = "Zone Air Temperature(SPACE1-1)";

fn bridge(root: &Path, id: EnvironmentId) -> SimulationBridge {
    SimulationBridge::with_reward_config(mock_config(root, id), &RewardConfig::five_zone()).unwrap()
}

#[test]
fn test_normalized_values_in_unit_interval() {
    let root = tempfile::tempdir().unwrap();
    let mut env =
        NormalizeObservation::new(bridge(root.path(), EnvironmentId::Demo), &RangeTable::five_zone())
            .unwrap();

    let (observation, _) = env.reset().unwrap();
    let raw = env.unwrapped_observation().unwrap().to_vec();
    assert_eq!(raw.len(), observation.len());
    assert_eq!(raw[0], 1991.0);

    for action in [0, 3, 9, 5] {
        let step = env.step(Action::Discrete(action)).unwrap();
        for (name, value) in env.observation_schema().zip(&step.observation) {
            assert!((0.0..=1.0).contains(&value), "{} = {}", name, value);
        }
        let raw = env.unwrapped_observation().unwrap();
        assert_eq!(raw.len(), step.observation.len());
        assert!(raw[0] >= 1989.0);
    }
}

#[test]
fn test_datetime_encoding() {
    let root = tempfile::tempdir().unwrap();
    let mut env = DatetimeWrapper::new(bridge(root.path(), EnvironmentId::Demo)).unwrap();
    assert_eq!(env.observation_schema().len(), 22);

    let (observation, _) = env.reset().unwrap();
    let schema = env.observation_schema();
    // 1991-01-01 was a Tuesday, midnight
    assert_eq!(observation[schema.index_of("is_weekend").unwrap()], 0.0);
    assert!((observation[schema.index_of("hour_sin").unwrap()]).abs() < 1e-12);
    assert!((observation[schema.index_of("hour_cos").unwrap()] - 1.0).abs() < 1e-12);
    assert_eq!(observation[schema.index_of("year").unwrap()], 1991.0);
}

#[test]
fn test_previous_values_lag_one_step() {
    let root = tempfile::tempdir().unwrap();
    let variables = vec![ZONE_TEMPERATURE.to_string()];
    let mut env =
        PreviousObservationWrapper::new(bridge(root.path(), EnvironmentId::Demo), &variables)
            .unwrap();
    let schema = env.observation_schema().clone();
    let current = schema.index_of(ZONE_TEMPERATURE).unwrap();
    let previous = schema
        .index_of(&format!("{}_previous", ZONE_TEMPERATURE))
        .unwrap();

    let (first, _) = env.reset().unwrap();
    assert_eq!(first[previous], 0.0);

    let second = env.step(Action::Discrete(0)).unwrap().observation;
    assert_eq!(second[previous], first[current]);

    let third = env.step(Action::Discrete(0)).unwrap().observation;
    assert_eq!(third[previous], second[current]);
}

#[test]
fn test_incremental_setpoints_clamp_per_dimension() {
    let root = tempfile::tempdir().unwrap();
    let inner = bridge(root.path(), EnvironmentId::FiveZoneHotContinuous);
    let mut env = DiscreteIncrementalWrapper::centered(inner, 2.0, 0.5).unwrap();
    assert_eq!(env.action_space(), &ActionSpace::Discrete { n: 17 });

    env.reset().unwrap();
    assert_eq!(env.current_setpoints(), &[18.75, 26.25]);

    // Action 4 raises heating by 2.0
    env.step(Action::Discrete(4)).unwrap();
    env.step(Action::Discrete(4)).unwrap();
    let step = env.step(Action::Discrete(4)).unwrap();
    assert_eq!(step.info.action, vec![22.5, 26.25]);

    // Action 16 lowers cooling by 2.0
    for _ in 0..4 {
        env.step(Action::Discrete(16)).unwrap();
    }
    assert_eq!(env.current_setpoints(), &[22.5, 22.5]);

    env.reset().unwrap();
    assert_eq!(env.current_setpoints(), &[18.75, 26.25]);
}

#[test]
fn test_history_after_reset_and_step() {
    let root = tempfile::tempdir().unwrap();
    let mut env = MultiObsWrapper::new(bridge(root.path(), EnvironmentId::Demo), 3).unwrap();
    assert_eq!(env.observation_schema().len(), 60);

    let (observation, _) = env.reset().unwrap();
    assert_eq!(observation.len(), 60);
    assert!(env.history().iter().all(|o| o == &env.history()[0]));

    let step = env.step(Action::Discrete(0)).unwrap();
    assert_eq!(step.observation.len(), 60);
    assert_ne!(env.history()[2], env.history()[0]);
}

#[test]
fn test_vector_reward() {
    let root = tempfile::tempdir().unwrap();
    let terms = vec!["reward_energy".to_string(), "reward_comfort".to_string()];
    let mut env =
        MultiObjectiveReward::new(bridge(root.path(), EnvironmentId::Demo), terms).unwrap();

    env.reset().unwrap();
    let step = env.step(Action::Discrete(0)).unwrap();
    match &step.reward {
        Reward::Vector(values) => {
            assert_eq!(values.len(), 2);
            assert_eq!(Some(values[0]), step.info.reward_term("reward_energy"));
            assert_eq!(Some(values[1]), step.info.reward_term("reward_comfort"));
            // Default weight 0.5
            assert!((0.5 * (values[0] + values[1]) - step.info.reward).abs() < 1e-9);
        }
        other => panic!("expected a vector reward, got {:?}", other),
    }
}

#[test]
fn test_logger_files_and_headers() {
    let root = tempfile::tempdir().unwrap();
    let normalized =
        NormalizeObservation::new(bridge(root.path(), EnvironmentId::Demo), &RangeTable::five_zone())
            .unwrap();
    let mut env = LoggerWrapper::new(normalized);

    env.reset().unwrap();
    let run_dir = env.inner().inner().run_dir().to_path_buf();
    let episode = run_dir.join("episode-1");

    let monitor = lines(&episode.join(MONITOR_FILE));
    assert_eq!(monitor.len(), 2);
    assert!(monitor[0].starts_with("timestep,year,month,day,hour,Site Outdoor Air Drybulb"));
    assert!(monitor[0].ends_with(
        "Heating_Setpoint_RL,Cooling_Setpoint_RL,time (seconds),reward,power_penalty,\
         comfort_penalty,abs_comfort,terminated,truncated"
    ));
    assert!(monitor[1].starts_with("0,1991,1,1,0,"));
    assert_eq!(lines(&episode.join(MONITOR_NORMALIZED_FILE))[0], monitor[0]);
    assert_eq!(lines(&run_dir.join(PROGRESS_FILE)).len(), 1);

    for _ in 0..3 {
        env.step(Action::Discrete(0)).unwrap();
    }
    env.close().unwrap();

    assert_eq!(lines(&episode.join(MONITOR_FILE)).len(), 5);
    let progress = lines(&run_dir.join(PROGRESS_FILE));
    assert_eq!(progress.len(), 2);
    assert!(progress[1].starts_with("1,"));
    assert!(progress[1].ends_with(",3,2700"));
}

#[test]
fn test_logger_files_survive_a_crash() {
    let root = tempfile::tempdir().unwrap();
    let config = crashing_config(root.path(), EnvironmentId::Demo, 1);
    let bridge = SimulationBridge::with_reward_config(config, &RewardConfig::five_zone()).unwrap();
    let run_dir = bridge.run_dir().to_path_buf();
    let mut env = LoggerWrapper::new(bridge);

    env.reset().unwrap();
    assert!(env.step(Action::Discrete(0)).is_err());

    let monitor = lines(&run_dir.join("episode-1").join(MONITOR_FILE));
    assert_eq!(monitor.len(), 2);
    assert!(monitor[0].starts_with("timestep,"));
    assert!(run_dir.join(PROGRESS_FILE).exists());
}

#[test]
fn test_full_stack_from_config() {
    let root = tempfile::tempdir().unwrap();
    let env = mock_config(root.path(), EnvironmentId::FiveZoneMixedContinuous);
    let config = PipelineConfig::new(env)
        .with_wrapper(WrapperConfig::Datetime)
        .with_wrapper(WrapperConfig::PreviousValue {
            variables: vec![ZONE_TEMPERATURE.to_string()],
        })
        .with_wrapper(WrapperConfig::Normalization { ranges: None })
        .with_wrapper(WrapperConfig::IncrementalSetpoint {
            initial_values: None,
            delta: 2.0,
            step: 0.5,
        })
        .with_wrapper(WrapperConfig::MultiObs { n: 2 })
        .with_wrapper(WrapperConfig::MultiObjective {
            terms: vec!["reward_energy".into(), "reward_comfort".into()],
        })
        .with_wrapper(WrapperConfig::Logger);

    let mut env = build_pipeline(&config).unwrap();
    assert_eq!(env.observation_schema().len(), 46);
    assert_eq!(env.action_space(), &ActionSpace::Discrete { n: 17 });

    check_env(env.as_mut(), 5).unwrap();

    let (observation, info) = env.reset().unwrap();
    assert_eq!(observation.len(), 46);
    assert_eq!(info.episode, 2);
    for k in 1..=4u64 {
        let step = env.step(Action::Discrete(0)).unwrap();
        assert_eq!(step.observation.len(), 46);
        assert_eq!(step.reward.arity(), 2);
        assert_eq!(step.info.time_elapsed, k * 900);
    }
    env.close().unwrap();
    env.close().unwrap();

    let run_dir = info.run_dir.unwrap();
    assert_eq!(lines(&run_dir.join(PROGRESS_FILE)).len(), 3);

    // Raw values survive the history stacking on top of normalization
    let episode = run_dir.join("episode-2");
    assert!(lines(&episode.join(MONITOR_FILE))[1].starts_with("0,1991,"));
    assert!(!lines(&episode.join(MONITOR_NORMALIZED_FILE))[1].starts_with("0,1991,"));
}
