//! Stash Agent Binary Entry Point

use anyhow::Context;
use clap::Parser;
use stash_agent::{load_config, run_agent, Args};
use stash_orchestrator::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args).context("Failed to load configuration")?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging(&config.logging).context("Failed to initialize logging")?;

    tokio::select! {
        result = run_agent(&args, &config) => {
            let report = result.map_err(|e| {
                tracing::error!("Command failed: {}", e);
                e
            })?;
            println!("{}", report);
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received, stopping agent...");
        }
    }

    Ok(())
}
