//! Main entry point for the statistics-gateway CLI

use anyhow::Context;
use clap::Parser;
use statistics_gateway::cli::Cli;
use statistics_gateway::metrics;
use statistics_gateway::Gateway;
use std::io::Write;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("statistics_gateway=info"));

    // Logs go to stderr so stdout carries only command output
    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(addr) = cli.metrics_addr {
        metrics::init_metrics(addr)
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))
            .context("Failed to start metrics exporter")?;
    }

    let config = cli.gateway_config()?;
    let gateway = Gateway::new(config)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = cli.execute(&gateway, &mut out).await {
        if let Some(hint) = e.suggestion() {
            warn!("Suggestion: {}", hint);
        }
        return Err(e.into());
    }
    out.flush()?;

    let stats = gateway.cache_stats();
    tracing::debug!(
        cached = stats.total,
        active = stats.active,
        expired = stats.expired,
        "Done"
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }
}
