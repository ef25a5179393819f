//! Headless runner: generates a level and drives the ecosystem turn by turn.

#[macro_use]
mod telemetry;
mod session;

use anyhow::{Context, Result};
use eco_core::RunnerConfig;
use session::Session;
use std::path::Path;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;

    telemetry::init_telemetry(config.json_logs)?;

    info!("Starting eco-runner");
    info!(
        width = config.ecosystem.world.width,
        height = config.ecosystem.world.height,
        seed = config.ecosystem.world.seed,
        turns = config.turns,
        "Configuration loaded"
    );

    let report_path = config.report_path.clone();
    let mut session = Session::new(config)?;
    info!(run_id = %session.run_id(), "Level generated");

    tokio::select! {
        result = session.run() => result?,
        _ = shutdown_signal() => info!("Run interrupted"),
    }
    let census = session.ecosystem().census();
    info!(
        turns = session.turns_completed(),
        season = %census.season,
        patches_full = census.patches_full,
        prey_attached = census.prey_attached,
        predators_attached = census.predators_attached,
        "Turn loop stopped"
    );

    if let Some(path) = report_path {
        let report = session.write_report(Path::new(&path)).await?;
        info!(
            turns = report.turns_completed,
            individuals = report.individuals,
            harvests = report.harvests,
            predations = report.predations,
            "Run summary"
        );
    }

    telemetry::shutdown_telemetry();

    Ok(())
}

/// Config file from the first argument, or defaults
fn load_config() -> Result<RunnerConfig> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(RunnerConfig::default());
    };
    let text =
        std::fs::read_to_string(&path).with_context(|| format!("reading config {}", path))?;
    let config =
        RunnerConfig::from_json(&text).with_context(|| format!("parsing config {}", path))?;
    Ok(config)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
