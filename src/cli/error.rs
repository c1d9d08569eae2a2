//! CLI error types and conversions

use crate::catalogue::CatalogueError;
use crate::fetcher::FetcherError;
use crate::gateway::GatewayError;
use crate::output::OutputError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Gateway error
    #[error("{0} [{kind}]", kind = .0.kind())]
    GatewayError(#[from] GatewayError),

    /// Output error
    #[error("output error: {0}")]
    OutputError(#[from] OutputError),

    /// IO error writing results
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}

impl CliError {
    /// Remediation hint for transport failures
    pub fn suggestion(&self) -> Option<&'static str> {
        let fetch = match self {
            CliError::GatewayError(GatewayError::Fetch(err)) => err,
            CliError::GatewayError(GatewayError::Catalogue(CatalogueError::Discovery {
                source, ..
            })) => source,
            _ => return None,
        };
        match fetch {
            FetcherError::Transport { kind, .. } => Some(kind.suggestion()),
            _ => None,
        }
    }
}
