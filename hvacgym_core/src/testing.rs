//! Scripted environment for wrapper unit tests.

use hvacgym_env::{
    Action, ActionSpace, Env, EnvError, Info, Observation, ObservationSchema, Reward, RewardArity,
    RewardTerm, Step,
};
use std::fs;
use std::path::PathBuf;

/// Plays back a fixed sequence of observations.
///
/// Observation `k` is returned after the `k`-th step (0 = reset); the last
/// one repeats once the script runs out. Reward terms are
/// `reward_energy = -timestep` and `reward_comfort = -2·timestep`.
pub struct ScriptedEnv {
    schema: ObservationSchema,
    script: Vec<Observation>,
    action_space: ActionSpace,
    action_variables: Vec<String>,
    reward_arity: RewardArity,
    reward_terms: Vec<String>,

    /// Directory in which `episode-<n>` directories are created
    pub run_dir: Option<PathBuf>,

    /// Terminate after this many steps
    pub episode_length: Option<u64>,

    pub actions: Vec<Action>,
    pub resets: u32,
    pub closes: u32,
    timestep: u64,
}

impl ScriptedEnv {
    pub fn new(names: &[&str], script: Vec<Observation>) -> Self {
        Self {
            schema: ObservationSchema::from_names(names).unwrap(),
            script,
            action_space: ActionSpace::Continuous {
                low: vec![15.0, 22.5],
                high: vec![22.5, 30.0],
            },
            action_variables: vec!["Heating_Setpoint_RL".into(), "Cooling_Setpoint_RL".into()],
            reward_arity: RewardArity::Scalar,
            reward_terms: vec!["reward_energy".into(), "reward_comfort".into()],
            run_dir: None,
            episode_length: None,
            actions: Vec::new(),
            resets: 0,
            closes: 0,
            timestep: 0,
        }
    }

    pub fn with_action_space(mut self, space: ActionSpace) -> Self {
        self.action_space = space;
        self
    }

    pub fn with_run_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.run_dir = Some(dir.into());
        self
    }

    fn observation(&self, k: u64) -> Observation {
        let k = (k as usize).min(self.script.len() - 1);
        self.script[k].clone()
    }

    fn info(&self) -> Info {
        let working_dir = self
            .run_dir
            .as_ref()
            .map(|dir| dir.join(format!("episode-{}", self.resets)));
        Info {
            episode: self.resets,
            timestep: self.timestep,
            time_elapsed: self.timestep * 900,
            year: 1991,
            month: 1,
            day: 1,
            working_dir,
            run_dir: self.run_dir.clone(),
            ..Default::default()
        }
    }
}

impl Env for ScriptedEnv {
    fn reset(&mut self) -> Result<(Observation, Info), EnvError> {
        self.resets += 1;
        self.timestep = 0;
        let mut info = self.info();
        if let Some(dir) = &info.working_dir {
            fs::create_dir_all(dir)?;
        }
        info.config = Some(serde_json::json!({ "env_name": "scripted" }));
        Ok((self.observation(0), info))
    }

    fn step(&mut self, action: Action) -> Result<Step, EnvError> {
        if self.resets == 0 {
            return Err(EnvError::invalid_state("step() called before reset()"));
        }
        let applied = match &action {
            Action::Continuous(values) => values.clone(),
            Action::Discrete(i) => vec![*i as f64],
        };
        self.actions.push(action);
        self.timestep += 1;

        let t = self.timestep as f64;
        let mut info = self.info();
        info.action = applied;
        info.reward_terms = vec![
            RewardTerm::new("reward_energy", -t),
            RewardTerm::new("reward_comfort", -2.0 * t),
        ];
        info.reward = -1.5 * t;
        info.total_power = 1000.0 * t;
        info.abs_comfort = t;

        Ok(Step {
            observation: self.observation(self.timestep),
            reward: Reward::Scalar(-1.5 * t),
            terminated: self.episode_length == Some(self.timestep),
            truncated: false,
            info,
        })
    }

    fn close(&mut self) -> Result<(), EnvError> {
        self.closes += 1;
        Ok(())
    }

    fn observation_schema(&self) -> &ObservationSchema {
        &self.schema
    }

    fn action_space(&self) -> &ActionSpace {
        &self.action_space
    }

    fn action_variables(&self) -> &[String] {
        &self.action_variables
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

/// A calendar-only script: `year, month, day, hour, temp`.
pub fn calendar_env() -> ScriptedEnv {
    ScriptedEnv::new(
        &["year", "month", "day", "hour", "temp"],
        vec![
            vec![1991.0, 1.0, 5.0, 0.0, 20.0],
            vec![1991.0, 1.0, 5.0, 6.0, 21.0],
            vec![1991.0, 1.0, 7.0, 12.0, 22.0],
            vec![1991.0, 12.0, 31.0, 23.0, 23.0],
        ],
    )
}
