//! CLI command implementations

use crate::gateway::config::{
    BASE_URL_ENV, DEFAULT_BASE_URL, DEFAULT_MAX_PER_WINDOW, DEFAULT_MIN_INTERVAL,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_WINDOW,
};
use crate::{Gateway, GatewayConfig, Granularity};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

pub mod categories;
pub mod error;
pub mod fetch;
pub mod fetch_set;
pub mod search;

pub use categories::CategoriesArgs;
pub use error::CliError;
pub use fetch::FetchArgs;
pub use fetch_set::FetchSetArgs;
pub use search::SearchArgs;

/// Statistics gateway CLI
#[derive(Parser, Debug)]
#[command(name = "statistics-gateway")]
#[command(about = "Fetch economic indicators from the Bank of Korea ECOS API", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// ECOS access token
    #[arg(long, global = true, env = "ECOS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// ECOS API base URL
    #[arg(long, global = true, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Per-request HTTP timeout in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs(),
          value_parser = clap::value_parser!(u64).range(1..=600))]
    pub timeout_secs: u64,

    /// Minimum spacing between upstream requests in milliseconds
    #[arg(long, global = true, default_value_t = DEFAULT_MIN_INTERVAL.as_millis() as u64)]
    pub min_interval_ms: u64,

    /// Rolling request-budget window in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_WINDOW.as_secs(),
          value_parser = clap::value_parser!(u64).range(1..))]
    pub window_secs: u64,

    /// Maximum upstream requests per window
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_PER_WINDOW,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub max_per_window: u32,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9000)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch one indicator
    Fetch(FetchArgs),

    /// Fetch several items of one category
    FetchSet(FetchSetArgs),

    /// List categories, or the items of one category
    Categories(CategoriesArgs),

    /// Search upstream series tables
    Search(SearchArgs),
}

/// Output format for series output
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SeriesFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
    /// CSV rows
    Csv,
}

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

impl Cli {
    /// Gateway configuration from the global flags
    ///
    /// # Errors
    /// [`CliError::ConfigurationError`] when no token is given or a value is invalid
    pub fn gateway_config(&self) -> Result<GatewayConfig, CliError> {
        let token = self
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                CliError::ConfigurationError(
                    "missing API key: pass --api-key or set ECOS_API_KEY".to_string(),
                )
            })?;

        let mut config = GatewayConfig::new(token).with_base_url(self.base_url.clone());
        config.http.request_timeout = Duration::from_secs(self.timeout_secs);
        config.rate_limit.min_interval = Duration::from_millis(self.min_interval_ms);
        config.rate_limit.window = Duration::from_secs(self.window_secs);
        config.rate_limit.max_per_window = self.max_per_window;

        config
            .validate()
            .map_err(|e| CliError::ConfigurationError(e.to_string()))?;
        Ok(config)
    }

    /// Run the selected command, writing results to `out`
    pub async fn execute(&self, gateway: &Gateway, out: &mut dyn Write) -> Result<(), CliError> {
        match &self.command {
            Commands::Fetch(args) => args.execute(gateway, out).await,
            Commands::FetchSet(args) => args.execute(gateway, out).await,
            Commands::Categories(args) => args.execute(gateway, out).await,
            Commands::Search(args) => args.execute(gateway, out).await,
        }
    }
}

/// Parse a granularity flag value
pub(crate) fn parse_granularity(s: &str) -> Result<Granularity, String> {
    s.parse()
}

/// Run `write` against `path` if given, otherwise against `out`
pub(crate) fn with_output<F>(path: Option<&Path>, out: &mut dyn Write, write: F) -> Result<(), CliError>
where
    F: FnOnce(&mut dyn Write) -> Result<(), CliError>,
{
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let mut file = BufWriter::new(File::create(path)?);
            write(&mut file)?;
            file.flush()?;
            Ok(())
        }
        None => write(out),
    }
}
