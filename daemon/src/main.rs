//! Proof-of-inference daemon: entry point for running an arbiter.

mod scenario;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use poi_node::{open_store, Arbiter, ArbiterConfig, StoreBackend};
use poi_nullables::NullClock;
use scenario::Scenario;

#[derive(Parser)]
#[command(name = "poi-daemon", about = "Proof-of-inference arbitration daemon")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "POI_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the LMDB store.
    #[arg(long, env = "POI_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Store backend: "memory" or "lmdb".
    #[arg(long, env = "POI_STORE")]
    store: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "POI_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "POI_LOG_FORMAT")]
    log_format: Option<String>,

    /// Print Prometheus metrics to stderr on exit.
    #[arg(long, env = "POI_ENABLE_METRICS")]
    metrics: bool,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Replay a scenario file, printing events and step outcomes as JSON lines.
    Replay {
        scenario: PathBuf,

        /// Stop at the first rejected step.
        #[arg(long)]
        strict: bool,
    },
    /// Validate the configuration and print the effective values.
    CheckConfig,
}

fn load_config(cli: &Cli) -> anyhow::Result<ArbiterConfig> {
    let mut config = match &cli.config {
        Some(path) => ArbiterConfig::from_toml_file(path)?,
        None => ArbiterConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(store) = &cli.store {
        config.store = match store.to_ascii_lowercase().as_str() {
            "memory" => StoreBackend::Memory,
            "lmdb" => StoreBackend::Lmdb,
            other => anyhow::bail!("unknown store backend {other:?} (expected \"memory\" or \"lmdb\")"),
        };
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    config.enable_metrics |= cli.metrics;
    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    poi_node::init_logging(config.log_format()?, &config.log_level).map_err(anyhow::Error::msg)?;

    match cli.command {
        Command::CheckConfig => {
            println!("admin = {}", config.admin);
            println!("arbitrators = {:?}", config.arbitrators);
            println!("store = {:?} ({})", config.store, config.data_dir.display());
            println!("{:#?}", config.params);
        }
        Command::Replay { scenario: path, strict } => {
            let scenario = Scenario::from_toml_file(&path)?;
            let clock = Arc::new(NullClock::new(scenario.start));
            let store = open_store(&config)?;
            let arbiter = match &store {
                Some(env) => Arbiter::restore(config.clone(), clock.clone(), env)?,
                None => Arbiter::new(config.clone(), clock.clone())?,
            };
            arbiter.subscribe(Box::new(|event| match serde_json::to_string(event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::error!(error = %e, "failed to encode event"),
            }));

            tracing::info!(steps = scenario.steps.len(), "replaying scenario");
            for (index, step) in scenario.steps.into_iter().enumerate() {
                let report = scenario::run_step(&arbiter, &clock, index, step);
                println!("{}", serde_json::to_string(&report)?);
                if strict && matches!(report, scenario::StepReport::Failed { .. }) {
                    anyhow::bail!("step {index} rejected");
                }
            }

            if let Some(env) = &store {
                let stats = arbiter.checkpoint(env).context("writing checkpoint")?;
                tracing::info!(requests = stats.requests, "state saved");
            }
            if config.enable_metrics {
                eprintln!("{}", arbiter.metrics().encode()?);
            }
            tracing::info!("replay finished");
        }
    }

    Ok(())
}
