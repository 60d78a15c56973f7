//! Simulation Bridge - owns the engine process of the current episode.
//!
//! # Lifecycle
//!
//! ```text
//!                 reset()            step()
//! Uninitialized ──────────► Ready ──────────► Stepping ──┐
//!       ▲                    ▲                    │ ▲     │ step()
//!       │                    │ reset()            │ └─────┘
//!       │                    └──── Terminated ◄───┘ end / truncation / crash
//!       │
//!  close() from any state ──► Closed  (reset() starts a fresh episode)
//! ```
//!
//! Each episode runs in `<run_dir>/episode-<n>`; the run directory is
//! `<output_root>/<env_name>-res<k>`, allocated once per bridge.

use crate::calendar::SimDate;
use crate::codec::{Frame, FrameCodec};
use crate::config::{ActionKind, EnvConfig};
use crate::reward::{RewardConfig, RewardContext, RewardFunction};
use crate::supervisor::{EngineHandle, ProcessSupervisor};
use hvacgym_env::{
    Action, ActionSpace, Env, EnvError, Info, Observation, ObservationSchema, Reward, RewardArity,
    RunId, Step,
};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Environment variables describing the episode to the engine
pub const ENV_BUILDING: &str = "HVACGYM_BUILDING";
pub const ENV_WEATHER: &str = "HVACGYM_WEATHER";
pub const ENV_OBSERVATION_VARIABLES: &str = "HVACGYM_OBSERVATION_VARIABLES";
pub const ENV_ACTION_VARIABLES: &str = "HVACGYM_ACTION_VARIABLES";
pub const ENV_TIMESTEPS_PER_HOUR: &str = "HVACGYM_TIMESTEPS_PER_HOUR";
pub const ENV_RUN_PERIOD_START: &str = "HVACGYM_RUN_PERIOD_START";
pub const ENV_RUN_PERIOD_END: &str = "HVACGYM_RUN_PERIOD_END";

/// Separator of variable names inside a single environment variable
pub const VARIABLE_SEPARATOR: char = '|';

/// Lifecycle phase of a [`SimulationBridge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Uninitialized,
    /// Reset done, no step yet
    Ready,
    Stepping,
    /// Episode over (end of run period, truncation or crash); reset required
    Terminated,
    Closed,
}

/// The innermost [`Env`]: speaks the frame protocol with one engine process
/// per episode.
pub struct SimulationBridge {
    config: EnvConfig,

    /// Serialized configuration returned with every reset
    config_echo: serde_json::Value,

    schema: ObservationSchema,
    action_space: ActionSpace,
    reward_arity: RewardArity,
    reward_terms: Vec<String>,
    reward_fn: Box<dyn RewardFunction>,

    supervisor: ProcessSupervisor,
    codec: FrameCodec,
    handle: Option<EngineHandle>,

    run_id: RunId,
    run_dir: PathBuf,
    working_dir: Option<PathBuf>,

    state: BridgeState,
    episode: u32,
    timestep: u64,

    /// Engine time of the last received state frame
    sim_time: f64,
    last_observation: Observation,
    last_date: Option<SimDate>,
}

impl SimulationBridge {
    /// Creates a bridge and allocates its run directory.
    ///
    /// The configuration is validated here; no engine is started before
    /// the first `reset()`.
    pub fn new(config: EnvConfig, reward_fn: Box<dyn RewardFunction>) -> Result<Self, EnvError> {
        config.validate()?;
        let schema = config.observation_schema()?;
        let action_space = config.action_space();
        let reward_terms = reward_fn.term_names().to_vec();
        let codec = FrameCodec::new(
            config.observation_variables.len(),
            config.action.variables.len(),
        );
        let supervisor = ProcessSupervisor::new(
            config.engine.clone(),
            episode_environment(&config)?,
            Duration::from_millis(config.terminate_timeout_ms),
        );
        let config_echo = serde_json::to_value(&config)?;

        let run_dir = allocate_run_dir(&config.output_root, &config.env_name)?;
        let run_id = RunId::new();
        info!(
            "[{}] Run {} uses directory {}",
            config.env_name,
            run_id,
            run_dir.display()
        );

        Ok(Self {
            config,
            config_echo,
            schema,
            action_space,
            reward_arity: RewardArity::Scalar,
            reward_terms,
            reward_fn,
            supervisor,
            codec,
            handle: None,
            run_id,
            run_dir,
            working_dir: None,
            state: BridgeState::Uninitialized,
            episode: 0,
            timestep: 0,
            sim_time: 0.0,
            last_observation: Vec::new(),
            last_date: None,
        })
    }

    /// Creates a bridge with a reward built from `reward` against the
    /// bridge schema.
    pub fn with_reward_config(config: EnvConfig, reward: &RewardConfig) -> Result<Self, EnvError> {
        let schema = config.observation_schema()?;
        let reward_fn = reward.build(&schema)?;
        Self::new(config, reward_fn)
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Whether an episode is currently allocated (reset done, not closed).
    pub fn episode_existed(&self) -> bool {
        !matches!(self.state, BridgeState::Uninitialized | BridgeState::Closed)
    }

    /// Episode number (1-based; 0 before the first reset).
    pub fn episode(&self) -> u32 {
        self.episode
    }

    pub fn timestep(&self) -> u64 {
        self.timestep
    }

    /// Simulated seconds since reset.
    pub fn time_elapsed(&self) -> u64 {
        self.timestep * self.step_size()
    }

    /// Simulated seconds per step.
    pub fn step_size(&self) -> u64 {
        self.config.step_size()
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Working directory of the current (or last) episode.
    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// Process id of the running engine, if an episode is live.
    pub fn engine_pid(&self) -> Option<u32> {
        self.handle.as_ref().map(EngineHandle::pid)
    }

    /// Stops the engine of the current episode, if any.
    fn stop_engine(&mut self) -> Result<(), EnvError> {
        match self.handle.take() {
            Some(mut handle) => self.supervisor.terminate(&mut handle),
            None => Ok(()),
        }
    }

    /// Marks the episode unusable after a crash or protocol error.
    fn abort_episode(&mut self, err: EnvError) -> EnvError {
        warn!(
            "[{}] Episode {} aborted at timestep {}: {}",
            self.config.env_name, self.episode, self.timestep, err
        );
        self.state = BridgeState::Terminated;
        if let Err(e) = self.stop_engine() {
            warn!("[{}] Failed to stop engine: {}", self.config.env_name, e);
        }
        err
    }

    /// Starts the engine and reads its first state frame.
    fn start_episode(&mut self, working_dir: &Path) -> Result<(f64, Vec<f64>), EnvError> {
        let mut handle = self.supervisor.start(working_dir)?;
        let timeout = Duration::from_millis(self.config.start_timeout_ms);
        let line = handle.recv(Some(timeout))?;
        let frame = self.codec.decode(line.as_bytes())?;
        self.handle = Some(handle);

        match frame {
            Frame::State { sim_time, values } => Ok((sim_time, values)),
            Frame::Terminated { .. } => Err(EnvError::protocol(
                "engine ended the simulation before the first timestep",
            )),
        }
    }

    /// Converts an action into the setpoint vector sent to the engine.
    fn setpoints_for(&self, action: &Action) -> Result<Vec<f64>, EnvError> {
        match (&self.config.action.kind, action) {
            (ActionKind::Discrete { mapping }, Action::Discrete(index)) => {
                mapping.get(*index).cloned().ok_or_else(|| {
                    EnvError::invalid_action(format!(
                        "action {} is outside Discrete({})",
                        index,
                        mapping.len()
                    ))
                })
            }
            (ActionKind::Continuous { .. }, Action::Continuous(values)) => {
                let dim = self.config.action.variables.len();
                if values.len() != dim {
                    return Err(EnvError::invalid_action(format!(
                        "continuous action has {} values, expected {}",
                        values.len(),
                        dim
                    )));
                }
                if values.iter().any(|v| !v.is_finite()) {
                    return Err(EnvError::invalid_action("continuous action is not finite"));
                }
                Ok(values.clone())
            }
            (ActionKind::Discrete { .. }, Action::Continuous(_)) => Err(
                EnvError::invalid_action("continuous action sent to a discrete environment"),
            ),
            (ActionKind::Continuous { .. }, Action::Discrete(_)) => Err(
                EnvError::invalid_action("discrete action sent to a continuous environment"),
            ),
        }
    }

    fn observation_at(&self, sim_time: f64, values: &[f64]) -> Result<(SimDate, Observation), EnvError> {
        let date = SimDate::from_sim_time(self.config.run_period.start, sim_time)?;
        let mut observation = Vec::with_capacity(self.schema.len());
        observation.extend_from_slice(&date.as_values());
        observation.extend_from_slice(values);
        Ok((date, observation))
    }

    fn base_info(&self, date: &SimDate) -> Info {
        Info {
            run_id: Some(self.run_id),
            episode: self.episode,
            timestep: self.timestep,
            time_elapsed: self.time_elapsed(),
            year: date.year,
            month: date.month,
            day: date.day,
            hour: date.hour,
            working_dir: self.working_dir.clone(),
            run_dir: Some(self.run_dir.clone()),
            ..Default::default()
        }
    }

    /// One protocol exchange: send setpoints, read the answer.
    fn exchange(&mut self, setpoints: &[f64]) -> Result<Frame, EnvError> {
        let request = self.codec.encode(setpoints, self.sim_time)?;
        let handle = self
            .handle
            .as_mut()
            .ok_or_else(|| EnvError::invalid_state("no engine is running"))?;
        handle.send(&request)?;
        let line = handle.recv(None)?;
        self.codec.decode(line.as_bytes())
    }
}

impl Env for SimulationBridge {
    fn reset(&mut self) -> Result<(Observation, Info), EnvError> {
        // No process outlives its episode
        self.stop_engine()?;

        self.episode += 1;
        self.timestep = 0;
        let working_dir = self.run_dir.join(format!("episode-{}", self.episode));
        fs::create_dir(&working_dir)?;
        self.working_dir = Some(working_dir.clone());

        let (sim_time, values) = match self.start_episode(&working_dir) {
            Ok(first) => first,
            Err(e) => return Err(self.abort_episode(e)),
        };
        let (date, observation) = match self.observation_at(sim_time, &values) {
            Ok(obs) => obs,
            Err(e) => return Err(self.abort_episode(e)),
        };

        self.sim_time = sim_time;
        self.last_observation = observation.clone();
        self.last_date = Some(date);
        self.state = BridgeState::Ready;

        info!(
            "[{}] Episode {} started in {}",
            self.config.env_name,
            self.episode,
            working_dir.display()
        );

        let mut info = self.base_info(&date);
        info.config = Some(self.config_echo.clone());
        Ok((observation, info))
    }

    fn step(&mut self, action: Action) -> Result<Step, EnvError> {
        match self.state {
            BridgeState::Ready | BridgeState::Stepping => {}
            BridgeState::Uninitialized => {
                return Err(EnvError::invalid_state("step() called before reset()"))
            }
            BridgeState::Terminated => {
                return Err(EnvError::invalid_state(
                    "episode is over, call reset() before stepping",
                ))
            }
            BridgeState::Closed => {
                return Err(EnvError::invalid_state("step() called after close()"))
            }
        }

        let setpoints = self.setpoints_for(&action)?;

        let frame = match self.exchange(&setpoints) {
            Ok(frame) => frame,
            Err(e) => return Err(self.abort_episode(e)),
        };
        self.timestep += 1;

        let terminated = matches!(frame, Frame::Terminated { .. });
        let (date, observation) = match frame {
            Frame::State { sim_time, values } => {
                let (date, observation) = match self.observation_at(sim_time, &values) {
                    Ok(obs) => obs,
                    Err(e) => return Err(self.abort_episode(e)),
                };
                self.sim_time = sim_time;
                self.last_observation = observation.clone();
                self.last_date = Some(date);
                (date, observation)
            }
            Frame::Terminated { .. } => {
                let date = self
                    .last_date
                    .ok_or_else(|| EnvError::invalid_state("no observation received yet"))?;
                (date, self.last_observation.clone())
            }
        };

        let truncated = self
            .config
            .max_episode_steps
            .map_or(false, |limit| self.timestep >= limit);

        let breakdown = self.reward_fn.compute(&RewardContext {
            observation: &observation,
            setpoints: &setpoints,
            date,
        });

        let mut info = self.base_info(&date);
        info.action = setpoints;
        info.reward = breakdown.reward;
        info.reward_terms = breakdown.terms;
        info.total_power = breakdown.total_power;
        info.abs_comfort = breakdown.abs_comfort;

        debug!(
            "[{}] Episode {} step {}: reward={:.4} terminated={} truncated={}",
            self.config.env_name, self.episode, self.timestep, breakdown.reward, terminated, truncated
        );

        if terminated || truncated {
            self.state = BridgeState::Terminated;
            self.stop_engine()?;
            info!(
                "[{}] Episode {} finished after {} steps ({})",
                self.config.env_name,
                self.episode,
                self.timestep,
                if terminated { "end of run period" } else { "truncated" }
            );
        } else {
            self.state = BridgeState::Stepping;
        }

        Ok(Step {
            observation,
            reward: Reward::Scalar(breakdown.reward),
            terminated,
            truncated,
            info,
        })
    }

    fn close(&mut self) -> Result<(), EnvError> {
        if self.state == BridgeState::Closed {
            return Ok(());
        }
        self.state = BridgeState::Closed;
        self.stop_engine()?;
        info!("[{}] Closed after {} episode(s)", self.config.env_name, self.episode);
        Ok(())
    }

    fn observation_schema(&self) -> &ObservationSchema {
        &self.schema
    }

    fn action_space(&self) -> &ActionSpace {
        &self.action_space
    }

    fn action_variables(&self) -> &[String] {
        &self.config.action.variables
    }

    fn reward_arity(&self) -> &RewardArity {
        &self.reward_arity
    }

    fn reward_terms(&self) -> &[String] {
        &self.reward_terms
    }

    fn unwrapped_observation(&self) -> Option<&[f64]> {
        None
    }
}

impl Drop for SimulationBridge {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("[{}] Failed to close: {}", self.config.env_name, e);
        }
    }
}

/// Environment handed to every engine process of this bridge.
fn episode_environment(config: &EnvConfig) -> Result<BTreeMap<String, String>, EnvError> {
    let sep = VARIABLE_SEPARATOR.to_string();
    let mut env = BTreeMap::new();
    env.insert(ENV_BUILDING.to_string(), absolute(&config.building)?);
    env.insert(ENV_WEATHER.to_string(), absolute(&config.weather)?);
    env.insert(
        ENV_OBSERVATION_VARIABLES.to_string(),
        config.observation_variables.join(&sep),
    );
    env.insert(
        ENV_ACTION_VARIABLES.to_string(),
        config.action.variables.join(&sep),
    );
    env.insert(
        ENV_TIMESTEPS_PER_HOUR.to_string(),
        config.timesteps_per_hour.to_string(),
    );
    env.insert(
        ENV_RUN_PERIOD_START.to_string(),
        config.run_period.start.to_string(),
    );
    env.insert(
        ENV_RUN_PERIOD_END.to_string(),
        config.run_period.end.to_string(),
    );
    Ok(env)
}

/// Relative model paths are resolved before the engine changes directory.
fn absolute(path: &Path) -> Result<String, EnvError> {
    let path = if path.is_relative() && path.components().count() > 1 {
        std::env::current_dir()?.join(path)
    } else {
        path.to_path_buf()
    };
    Ok(path.display().to_string())
}

/// Creates `<root>/<name>-res<k>` for the first free `k` (starting at 1).
fn allocate_run_dir(root: &Path, name: &str) -> Result<PathBuf, EnvError> {
    fs::create_dir_all(root)?;
    for k in 1u32.. {
        let candidate = root.join(format!("{}-res{}", name, k));
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(EnvError::configuration(format!(
        "no free run directory for '{}' under {}",
        name,
        root.display()
    )))
}
