//! CLI entrypoint for Swarm Orchestrator
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod demo;

use anyhow::{Result, anyhow, bail};
use clap::Parser;
use std::sync::Arc;
use swarm_application::SwarmCoordinator;
use swarm_infrastructure::{
    ConfigLoader, FileLoggingConfig, HeuristicAnalysis, InMemorySwarmStore, InProcessEventBus,
    JsonlEventRecorder, SimulatedAgentPool,
};
use swarm_presentation::{Cli, Command, OutputConfig};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources();
        return Ok(());
    }

    let file_config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };

    let _log_guard = init_logging(cli.verbose, &file_config.logging);
    info!("Starting Swarm Orchestrator");

    let issues = file_config.validate();
    for issue in &issues {
        if issue.is_error() {
            error!("{}", issue);
        } else {
            warn!("{}", issue);
        }
    }
    let errors = issues.iter().filter(|i| i.is_error()).count();
    if errors > 0 {
        bail!("Invalid configuration: {} error(s)", errors);
    }

    let output = OutputConfig::new(
        file_config.output.format.unwrap_or_default(),
        file_config.output.color,
    )
    .with_progress(file_config.output.progress)
    .with_format_override(cli.format.map(Into::into));
    output.apply();

    // === Dependency Injection ===
    let store = Arc::new(InMemorySwarmStore::new());
    let bus = Arc::new(InProcessEventBus::new());

    let recorder_token = CancellationToken::new();
    let recorder = file_config
        .logging
        .events_jsonl
        .as_ref()
        .and_then(JsonlEventRecorder::new)
        .map(|recorder| {
            info!(path = %recorder.path().display(), "Recording bus events");
            Arc::new(recorder).attach(bus.as_ref(), recorder_token.clone())
        });

    let progress = output.progress_notifier(cli.quiet);

    let coordinator = SwarmCoordinator::new(
        store.clone(),
        bus.clone(),
        Arc::new(HeuristicAnalysis::new()),
        file_config.to_swarm_config(),
    )
    .with_progress(progress);
    coordinator.start_background().await;

    let mut pool = SimulatedAgentPool::new(store, bus);
    let outcome = match cli.command.unwrap_or(Command::Demo) {
        Command::Demo => demo::run_demo(&coordinator, &mut pool, output.format).await,
        Command::Run(args) => demo::run_task(&coordinator, &mut pool, args, output.format).await,
        Command::Propose(args) => demo::run_proposal(&coordinator, args, output.format).await,
    };

    coordinator.shutdown().await;
    pool.stop();
    recorder_token.cancel();
    if let Some(handle) = recorder
        && let Err(e) = handle.await
    {
        warn!("Event recorder did not stop cleanly: {}", e);
    }

    outcome
}

/// Console logging filtered by `-v`, plus an optional daily rolling file.
///
/// Without `-v` the filter comes from `RUST_LOG`, then from the config file.
fn init_logging(verbose: u8, logging: &FileLoggingConfig) -> Option<WorkerGuard> {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(logging.level())),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let (file_layer, guard) = match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "swarm-orchestrator.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    guard
}
