//! Upstream fetchers
//!
//! Two seams separate the layers. [`Transport`] performs one raw GET and
//! returns the decoded JSON envelope. [`SeriesSource`] is the typed,
//! cache- and rate-limit-aware interface the gateway and the catalogue
//! resolver call. [`series::SeriesFetcher`] implements the latter on top of
//! the former.

use crate::period::PeriodError;
use crate::{CatalogueItem, SeriesQuery, SeriesResult, StatisticTable};
use async_trait::async_trait;
use serde_json::Value;

pub mod client;
pub mod ecos_config;
pub mod ecos_http;
pub mod ecos_parser;
pub mod request;
pub mod series;
pub mod transport_error;

pub use request::UpstreamRequest;
pub use transport_error::TransportErrorKind;

/// Fetcher errors
///
/// The variants are the typed taxonomy callers branch on; no raw transport
/// error crosses this boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetcherError {
    /// Query rejected before any upstream call
    #[error("invalid query: {0}")]
    Validation(String),

    /// Timeout, connection failure, non-2xx status or undecodable body
    #[error("{kind}: {message}")]
    Transport {
        /// Classified cause
        kind: TransportErrorKind,
        /// Detail with any URL stripped
        message: String,
    },

    /// Upstream answered with a non-success result code
    #[error("upstream error {code}: {message}")]
    Upstream {
        /// Upstream result code, e.g. "ERROR-100"
        code: String,
        /// Upstream message
        message: String,
    },

    /// Upstream has no data for the requested window
    #[error("no data for period ({code}): {message}")]
    NoDataForPeriod {
        /// Upstream result code
        code: String,
        /// Upstream message
        message: String,
    },

    /// The source does not implement this operation
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

impl FetcherError {
    /// Convert a reqwest error, dropping the URL (it carries the access token)
    pub fn transport(err: reqwest::Error) -> Self {
        let kind = TransportErrorKind::classify(&err);
        Self::Transport {
            kind,
            message: err.without_url().to_string(),
        }
    }

    /// A body that could not be interpreted as an upstream envelope
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Transport {
            kind: TransportErrorKind::Decode,
            message: message.into(),
        }
    }

    /// Whether this is the "no data for this query" condition
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoDataForPeriod { .. })
    }
}

impl From<PeriodError> for FetcherError {
    fn from(err: PeriodError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Raw upstream access
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue one GET for `request` and return the decoded JSON body
    ///
    /// # Errors
    /// Returns [`FetcherError::Transport`] for timeouts, connection failures,
    /// non-2xx statuses and bodies that are not JSON. Result codes inside the
    /// body are not inspected here.
    async fn get(&self, request: &UpstreamRequest) -> FetcherResult<Value>;
}

/// Typed access to series, item listings and table listings
#[async_trait]
pub trait SeriesSource: Send + Sync {
    /// Fetch one series window
    ///
    /// # Arguments
    /// * `query` - Fully-resolved series query
    ///
    /// # Returns
    /// The rows for the window; an empty result when the upstream reports
    /// no data for it
    ///
    /// # Errors
    /// Validation, transport and upstream logic errors. Implementations may
    /// also report [`FetcherError::NoDataForPeriod`] instead of an empty result.
    async fn fetch_series(&self, query: &SeriesQuery) -> FetcherResult<SeriesResult>;

    /// List every item the upstream knows for a series code
    ///
    /// # Arguments
    /// * `series_code` - Series (table) code, e.g. "901Y010"
    async fn list_items(&self, series_code: &str) -> FetcherResult<Vec<CatalogueItem>>;

    /// List the upstream's series tables
    async fn list_tables(&self) -> FetcherResult<Vec<StatisticTable>> {
        Err(FetcherError::Unsupported("table listing".to_string()))
    }
}
