//! OCSASim launcher.
//!
//! # Usage
//!
//! ```bash
//! # One counter and one GPS sim with defaults
//! ocsasim
//!
//! # Sims from a config file
//! ocsasim --config sims.toml --log-level debug
//! ```
//!
//! Runs until Ctrl-C, then stops every sim. Commands are read from stdin as
//! `<sim-name> <command-json>` lines.

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use ocsasim_driver::{ConsoleHub, DriverConfig, DriverError, SimRegistry, SystemEnv};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Time allowed for blocking stdin reads to unwind at exit.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Simulated sensors for a sensor hub
#[derive(Parser, Debug)]
#[command(name = "ocsasim")]
#[command(about = "Run simulated sensors that publish observations and accept commands")]
#[command(version)]
struct Args {
    /// Path to a TOML file listing the sims to run
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not read commands from stdin
    #[arg(long)]
    no_stdin: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(args));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => DriverConfig::load(path)?,
        None => DriverConfig::default(),
    };

    tracing::info!(sims = config.sims.len(), "OCSASim starting");

    let hub = Arc::new(ConsoleHub::new());
    let mut registry = SimRegistry::from_config(&config, &hub, &SystemEnv::new())?;

    registry.insert_all().await;
    registry.start_all().await;
    if registry.is_empty() {
        return Err(DriverError::NoSims.into());
    }

    let reader = (!args.no_stdin).then(|| hub.spawn_stdin_reader());

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");

    if let Some(reader) = reader {
        reader.abort();
    }
    let failures = registry.stop_all().await;
    for (sim, phase) in registry.phases() {
        tracing::debug!(sim = %sim, %phase, "final phase");
    }

    match failures.into_iter().next() {
        Some(failure) => Err(DriverError::Sim(failure.error).into()),
        None => Ok(()),
    }
}
