//! Shared setup: preset configurations pointed at the mock engine.

#![allow(dead_code)]

use chrono::NaiveDate;
use hvacgym_core::{EngineConfig, EnvConfig, EnvironmentId, RunPeriod};
use std::path::Path;

pub const MOCK_ENGINE: &str = env!("CARGO_BIN_EXE_hvacgym-mock-engine");

/// Steps in one simulated day at 4 timesteps per hour
pub const STEPS_PER_DAY: u64 = 96;

pub fn one_day() -> RunPeriod {
    let day = NaiveDate::from_ymd_opt(1991, 1, 1).unwrap();
    RunPeriod { start: day, end: day }
}

pub fn mock_engine() -> EngineConfig {
    EngineConfig::new(MOCK_ENGINE).with_env("HVACGYM_MOCK_SEED", "7")
}

/// A preset running one day on the mock engine under `root`.
pub fn mock_config(root: &Path, id: EnvironmentId) -> EnvConfig {
    let mut config = EnvConfig::preset(id)
        .with_output_root(root)
        .with_engine(mock_engine());
    config.run_period = one_day();
    config.start_timeout_ms = 10_000;
    config
}

/// Same, with the engine crashing on request `after`.
pub fn crashing_config(root: &Path, id: EnvironmentId, after: u64) -> EnvConfig {
    let engine = mock_engine().with_env("HVACGYM_MOCK_CRASH_AFTER", after.to_string());
    mock_config(root, id).with_engine(engine)
}

/// A preset whose engine is `sh -c <script>`.
pub fn scripted_config(root: &Path, id: EnvironmentId, script: &str) -> EnvConfig {
    let mut engine = EngineConfig::new("sh");
    engine.args = vec!["-c".to_string(), script.to_string()];
    mock_config(root, id).with_engine(engine)
}

/// A state frame carrying `count` copies of `value`.
pub fn state_frame(sim_time: &str, count: usize, value: &str) -> String {
    format!("2 0 {} 0 0 {} {}", count, sim_time, vec![value; count].join(" "))
}

/// Whether the process has exited and been reaped.
#[cfg(target_os = "linux")]
pub fn process_gone(pid: u32) -> bool {
    !Path::new(&format!("/proc/{}", pid)).exists()
}

pub fn lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}
