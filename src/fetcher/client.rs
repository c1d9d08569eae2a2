//! HTTP client construction
//!
//! One `reqwest::Client` is built per gateway and shared by every request it
//! issues, so connection pooling spans the whole run. There is no process-wide
//! singleton: tests build gateways with their own transports.

use crate::fetcher::{FetcherError, FetcherResult};
use crate::gateway::config::HttpConfig;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::sync::Arc;

/// Build the shared HTTP client
///
/// Redirects are not followed: ECOS answers misrouted calls with redirects
/// to HTML pages, which are reported as non-2xx transport errors instead.
///
/// # Errors
/// Returns [`FetcherError::Transport`] if the TLS backend cannot be initialised.
pub fn build_http_client(config: &HttpConfig) -> FetcherResult<Arc<Client>> {
    Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .redirect(Policy::none())
        .user_agent(concat!("statistics-gateway/", env!("CARGO_PKG_VERSION")))
        .build()
        .map(Arc::new)
        .map_err(FetcherError::transport)
}
