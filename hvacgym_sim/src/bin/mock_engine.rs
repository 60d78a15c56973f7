//! hvacgym mock engine
//!
//! Stand-in building-energy engine speaking the frame protocol on
//! stdin/stdout. The episode is described by the `HVACGYM_*` environment
//! variables set by the bridge; the building itself is a
//! [`BuildingOracle`].
//!
//! Extra variables:
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `HVACGYM_MOCK_SEED` | noise seed (default 0) |
//! | `HVACGYM_MOCK_CRASH_AFTER` | exit without answering request `k` |

use chrono::NaiveDate;
use hvacgym_core::bridge::{
    ENV_ACTION_VARIABLES, ENV_OBSERVATION_VARIABLES, ENV_RUN_PERIOD_END, ENV_RUN_PERIOD_START,
    ENV_TIMESTEPS_PER_HOUR, ENV_WEATHER, VARIABLE_SEPARATOR,
};
use hvacgym_core::codec::{decode_request, encode_end, encode_state};
use hvacgym_core::config::RunPeriod;
use hvacgym_env::EnvError;
use hvacgym_sim::{mean_outdoor_temperature, BuildingOracle};
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const ENV_MOCK_SEED: &str = "HVACGYM_MOCK_SEED";
const ENV_MOCK_CRASH_AFTER: &str = "HVACGYM_MOCK_CRASH_AFTER";

/// Exit status of an injected crash
const CRASH_EXIT_CODE: u8 = 3;

/// Episode as described by the bridge.
struct Episode {
    observation_variables: Vec<String>,
    action_count: usize,
    step_size: u64,
    total_steps: u64,
    start: NaiveDate,
    weather: String,
    seed: u64,
    crash_after: Option<u64>,
}

fn var(key: &str) -> Result<String, EnvError> {
    std::env::var(key).map_err(|_| EnvError::configuration(format!("{} is not set", key)))
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, EnvError> {
    value
        .trim()
        .parse()
        .map_err(|_| EnvError::configuration(format!("{}='{}' is not valid", key, value)))
}

fn split(value: &str) -> Vec<String> {
    value
        .split(VARIABLE_SEPARATOR)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

impl Episode {
    fn from_env() -> Result<Self, EnvError> {
        let observation_variables = split(&var(ENV_OBSERVATION_VARIABLES)?);
        if observation_variables.is_empty() {
            return Err(EnvError::configuration("no observation variables"));
        }
        let action_count = split(&var(ENV_ACTION_VARIABLES)?).len();

        let tph: u64 = parse(ENV_TIMESTEPS_PER_HOUR, &var(ENV_TIMESTEPS_PER_HOUR)?)?;
        if tph == 0 || 3600 % tph != 0 {
            return Err(EnvError::configuration(format!(
                "{} timesteps per hour do not divide an hour",
                tph
            )));
        }

        let period = RunPeriod {
            start: parse(ENV_RUN_PERIOD_START, &var(ENV_RUN_PERIOD_START)?)?,
            end: parse(ENV_RUN_PERIOD_END, &var(ENV_RUN_PERIOD_END)?)?,
        };

        let seed = match std::env::var(ENV_MOCK_SEED) {
            Ok(value) => parse(ENV_MOCK_SEED, &value)?,
            Err(_) => 0,
        };
        let crash_after = match std::env::var(ENV_MOCK_CRASH_AFTER) {
            Ok(value) => Some(parse(ENV_MOCK_CRASH_AFTER, &value)?),
            Err(_) => None,
        };

        Ok(Self {
            observation_variables,
            action_count,
            step_size: 3600 / tph,
            total_steps: period.days() * 24 * tph,
            start: period.start,
            weather: std::env::var(ENV_WEATHER).unwrap_or_default(),
            seed,
            crash_after,
        })
    }
}

enum Outcome {
    Finished,
    Crashed(u64),
}

fn run() -> Result<Outcome, EnvError> {
    let episode = Episode::from_env()?;
    let mut oracle = BuildingOracle::new(
        episode.seed,
        episode.start,
        episode.step_size,
        &episode.observation_variables,
    )?
    .with_mean_outdoor(mean_outdoor_temperature(&episode.weather))?;

    info!(
        "Mock engine: {} outputs, {} setpoints, {} steps of {}s from {}",
        episode.observation_variables.len(),
        episode.action_count,
        episode.total_steps,
        episode.step_size,
        episode.start
    );

    let mut stdout = io::stdout().lock();
    stdout.write_all(encode_state(oracle.sim_time(), &oracle.observe()).as_bytes())?;
    stdout.flush()?;

    let mut requests = 0u64;
    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let (_, setpoints) = decode_request(&line, episode.action_count)?;
        requests += 1;

        if episode.crash_after == Some(requests) {
            return Ok(Outcome::Crashed(requests));
        }

        oracle.apply_setpoints(&setpoints);
        let frame = if requests >= episode.total_steps {
            encode_end(oracle.sim_time() + episode.step_size as f64)
        } else {
            oracle.advance()?;
            encode_state(oracle.sim_time(), &oracle.observe())
        };
        stdout.write_all(frame.as_bytes())?;
        stdout.flush()?;

        debug!("Request {}: setpoints {:?}", requests, setpoints);
        if requests >= episode.total_steps {
            info!("Run period finished after {} steps", requests);
            break;
        }
    }

    Ok(Outcome::Finished)
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to set tracing subscriber");
    }

    match run() {
        Ok(Outcome::Finished) => ExitCode::SUCCESS,
        Ok(Outcome::Crashed(at)) => {
            error!("Injected crash at request {}", at);
            ExitCode::from(CRASH_EXIT_CODE)
        }
        Err(e) => {
            error!("Mock engine failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
