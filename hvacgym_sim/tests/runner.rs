//! Episode runner, export and CLI end to end.

mod common;

use common::{crashing_config, mock_config, MOCK_ENGINE};
use hvacgym_core::monitor::PROGRESS_FILE;
use hvacgym_core::{build_pipeline, EnvironmentId, PipelineConfig, WrapperConfig};
use hvacgym_sim::{ConstantAgent, EpisodeRunner, RandomAgent, RunExport};
use std::process::Command;

#[test]
fn test_runner_truncated_episodes() {
    let root = tempfile::tempdir().unwrap();
    let env = mock_config(root.path(), EnvironmentId::FiveZoneCoolDiscrete).with_max_episode_steps(10);
    let config = PipelineConfig::new(env).with_wrapper(WrapperConfig::Logger);
    let mut env = build_pipeline(&config).unwrap();

    let runner = EpisodeRunner::new(2).with_recording(true);
    let mut results = runner.run(env.as_mut(), &mut RandomAgent::new(3));

    assert_eq!(results.len(), 2);
    for (i, result) in results.iter().enumerate() {
        assert!(result.passed(), "{:?}", result.failure_reason);
        assert_eq!(result.episode, i as u32 + 1);
        assert_eq!(result.steps, 10);
        assert_eq!(result.time_elapsed, 9000);
        assert!(result.truncated);
        assert!(!result.terminated);
        assert!(result.mean_power > 0.0);
        assert_eq!(result.frames.len(), 10);
    }

    let mut export = RunExport::new("cool", "random", 3, env.observation_schema().names().to_vec());
    for result in results.iter_mut() {
        export.add_episode(result);
    }
    assert!(export.passed);
    assert_eq!(export.frame_count(), 20);

    // The runner closes the pipeline, which flushes the last progress row
    let run_dir = root.path().join("Eplus-5Zone-cool-discrete-v1-res1");
    let progress = std::fs::read_to_string(run_dir.join(PROGRESS_FILE)).unwrap();
    assert_eq!(progress.lines().count(), 3);
}

#[test]
fn test_runner_full_episode_terminates() {
    let root = tempfile::tempdir().unwrap();
    let config = PipelineConfig::new(mock_config(root.path(), EnvironmentId::Demo));
    let mut env = build_pipeline(&config).unwrap();

    let mut agent = ConstantAgent::for_space(env.action_space(), 5).unwrap();
    let results = EpisodeRunner::new(1).run(env.as_mut(), &mut agent);

    assert!(results[0].terminated);
    assert_eq!(results[0].steps, common::STEPS_PER_DAY);
    assert_eq!(results[0].time_elapsed, 86_400);
    assert!(results[0].frames.is_empty());
}

#[test]
fn test_runner_reports_crash_and_continues() {
    let root = tempfile::tempdir().unwrap();
    let config = PipelineConfig::new(crashing_config(root.path(), EnvironmentId::Demo, 3));
    let mut env = build_pipeline(&config).unwrap();

    let results = EpisodeRunner::new(2).run(env.as_mut(), &mut RandomAgent::new(1));

    assert_eq!(results.len(), 2);
    for result in &results {
        assert!(!result.passed());
        assert_eq!(result.steps, 2);
        assert!(result.failure_reason.as_deref().unwrap().contains("crashed"));
    }
    assert_eq!(results[1].episode, 2);
}

#[test]
fn test_cli_json_summary_and_export() {
    let root = tempfile::tempdir().unwrap();
    let export = root.path().join("run.json");

    let output = Command::new(env!("CARGO_BIN_EXE_hvacgym"))
        .args(["--env", "5zone-hot-continuous", "--episodes", "2", "--max-steps", "6"])
        .args(["--agent", "constant", "--json", "--seed", "9"])
        .arg("--engine")
        .arg(MOCK_ENGINE)
        .arg("--output-root")
        .arg(root.path())
        .arg("--export")
        .arg(&export)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["total"], 2);
    assert_eq!(summary["failed"], 0);
    assert_eq!(summary["episodes"][1]["steps"], 6);
    assert_eq!(summary["episodes"][1]["truncated"], true);

    let exported: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&export).unwrap()).unwrap();
    assert_eq!(exported["agent"], "constant");
    assert_eq!(exported["episodes"][0]["frames"].as_array().unwrap().len(), 6);
    assert_eq!(exported["episodes"][0]["frames"][0]["action"][0], 18.75);

    let run_dir = root.path().join("Eplus-5Zone-hot-continuous-v1-res1");
    assert!(run_dir.join("episode-2").join("monitor_normalized.csv").exists());
}

#[test]
fn test_cli_fails_on_unknown_environment() {
    let root = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_hvacgym"))
        .args(["--env", "no-such-building", "--output-root"])
        .arg(root.path())
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}
