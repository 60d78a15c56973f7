//! hvacgym CLI
//!
//! Run episodes of a configured pipeline with a random or constant agent.

use clap::{Parser, ValueEnum};
use hvacgym_core::{
    build_pipeline, EngineConfig, EnvConfig, EnvironmentId, PipelineConfig, WrapperConfig,
};
use hvacgym_env::EnvError;
use hvacgym_sim::{Agent, ConstantAgent, EpisodeResult, EpisodeRunner, RandomAgent, RunExport};
use std::path::PathBuf;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Name of the mock engine binary shipped next to this one
const MOCK_ENGINE: &str = "hvacgym-mock-engine";

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum AgentKind {
    Random,
    Constant,
}

/// hvacgym building-control episode runner
#[derive(Parser, Debug)]
#[command(name = "hvacgym")]
#[command(about = "Run control episodes against a building-energy engine", long_about = None)]
struct Args {
    /// Pipeline configuration (JSON); overrides --env
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Built-in environment (e.g. demo, 5zone-hot-continuous, Eplus-5Zone-cool-discrete-v1)
    #[arg(short, long, default_value = "demo")]
    env: String,

    /// Engine program (default: the mock engine next to this binary)
    #[arg(long)]
    engine: Option<PathBuf>,

    /// Number of episodes
    #[arg(short = 'n', long, default_value = "1")]
    episodes: u32,

    /// Truncate episodes after this many steps
    #[arg(short, long)]
    max_steps: Option<u64>,

    /// Action policy
    #[arg(short, long, value_enum, default_value = "random")]
    agent: AgentKind,

    /// Discrete action index for the constant agent
    #[arg(long, default_value = "0")]
    action: usize,

    /// Seed for the agent and the mock engine (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Parent directory of run directories
    #[arg(short, long)]
    output_root: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for scripting
    #[arg(long)]
    json: bool,

    /// Export per-step records to a JSON file
    #[arg(long)]
    export: Option<PathBuf>,
}

/// The mock engine installed next to the running executable, if any.
fn sibling_mock_engine() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let mock = exe.with_file_name(format!("{}{}", MOCK_ENGINE, std::env::consts::EXE_SUFFIX));
    mock.is_file().then_some(mock)
}

fn load_config(args: &Args, seed: u64) -> Result<PipelineConfig, EnvError> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading pipeline from {}", path.display());
            PipelineConfig::from_json_file(path)?
        }
        None => {
            let id: EnvironmentId = args.env.parse().map_err(EnvError::configuration)?;
            PipelineConfig::new(EnvConfig::preset(id))
                .with_wrapper(WrapperConfig::Normalization { ranges: None })
                .with_wrapper(WrapperConfig::Logger)
        }
    };

    let engine = match (&args.engine, &args.config) {
        (Some(program), _) => Some(EngineConfig::new(program)),
        (None, None) => sibling_mock_engine().map(EngineConfig::new),
        (None, Some(_)) => None,
    };
    if let Some(engine) = engine {
        let engine = engine.with_env("HVACGYM_MOCK_SEED", seed.to_string());
        info!("Engine: {}", engine.program.display());
        config.env = config.env.with_engine(engine);
    }

    if let Some(steps) = args.max_steps {
        config.env = config.env.with_max_episode_steps(steps);
    }
    if let Some(root) = &args.output_root {
        config.env = config.env.with_output_root(root);
    }
    Ok(config)
}

fn run(args: &Args, seed: u64) -> Result<Vec<EpisodeResult>, EnvError> {
    let config = load_config(args, seed)?;
    let mut env = build_pipeline(&config)?;

    let mut agent: Box<dyn Agent> = match args.agent {
        AgentKind::Random => Box::new(RandomAgent::new(seed)),
        AgentKind::Constant => Box::new(ConstantAgent::for_space(env.action_space(), args.action)?),
    };

    let runner = EpisodeRunner::new(args.episodes).with_recording(args.export.is_some());
    let mut results = runner.run(env.as_mut(), agent.as_mut());

    if let Some(path) = &args.export {
        let mut export = RunExport::new(
            &config.env.env_name,
            agent.name(),
            seed,
            env.observation_schema().names().to_vec(),
        );
        for result in results.iter_mut() {
            export.add_episode(result);
        }
        export.write_to_file(path)?;
        info!("Exported {} frames to {}", export.frame_count(), path.display());
    }

    Ok(results)
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to set tracing subscriber");
    }

    // Determine seed
    let seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    let results = match run(&args, seed) {
        Ok(results) => results,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let failed = results.iter().filter(|r| !r.passed()).count();

    if args.json {
        let summary = serde_json::json!({
            "seed": seed,
            "total": results.len(),
            "failed": failed,
            "episodes": results.iter().map(|r| {
                serde_json::json!({
                    "episode": r.episode,
                    "steps": r.steps,
                    "time_elapsed": r.time_elapsed,
                    "total_reward": r.total_reward,
                    "mean_reward": r.mean_reward,
                    "mean_power": r.mean_power,
                    "comfort_violation_pct": r.comfort_violation_pct,
                    "terminated": r.terminated,
                    "truncated": r.truncated,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to encode summary: {}", e);
                std::process::exit(1);
            }
        }
    } else if failed == 0 {
        info!("All {} episode(s) finished", results.len());
    } else {
        warn!("{}/{} episode(s) failed", failed, results.len());
        for result in results.iter().filter(|r| !r.passed()) {
            error!(
                "  - episode {}: {}",
                result.episode,
                result.failure_reason.as_deref().unwrap_or("unknown")
            );
        }
    }

    // Exit with proper code for scripts
    if failed > 0 {
        std::process::exit(1);
    }
}
