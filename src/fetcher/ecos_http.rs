//! ECOS HTTP transport
//!
//! Performs exactly one GET per call. Pacing, caching and result-code
//! interpretation happen in [`crate::fetcher::series::SeriesFetcher`].

use crate::fetcher::{FetcherError, FetcherResult, Transport, TransportErrorKind, UpstreamRequest};
use crate::metrics::HttpRequestMetrics;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Longest response-body excerpt kept in a status error
const BODY_EXCERPT_CHARS: usize = 200;

/// Transport over the ECOS REST API
pub struct EcosHttpClient {
    client: Arc<Client>,
    base_url: String,
    access_token: String,
}

impl EcosHttpClient {
    /// Create a transport
    ///
    /// # Arguments
    /// * `client` - Shared HTTP client
    /// * `base_url` - ECOS base URL, e.g. "<https://ecos.bok.or.kr/api>"
    /// * `access_token` - ECOS access token; only ever placed in the URL
    pub fn new(
        client: Arc<Client>,
        base_url: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            access_token: access_token.into(),
        }
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for EcosHttpClient {
    async fn get(&self, request: &UpstreamRequest) -> FetcherResult<Value> {
        let url = request.url(&self.base_url, &self.access_token);
        let metrics = HttpRequestMetrics::start(request.service.as_str());

        debug!(
            correlation_id = %metrics.correlation_id(),
            path = %request.redacted_path(),
            "Sending upstream request"
        );

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                let err = FetcherError::transport(e);
                if let FetcherError::Transport { kind, .. } = &err {
                    metrics.record_transport_error(kind);
                }
                return Err(err);
            }
        };

        let status = response.status();
        metrics.record_complete(status.as_u16());

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(BODY_EXCERPT_CHARS).collect();
            warn!(
                correlation_id = %metrics.correlation_id(),
                status = status.as_u16(),
                service = %request.service,
                "Upstream returned non-success status"
            );
            return Err(FetcherError::Transport {
                kind: TransportErrorKind::Status(status.as_u16()),
                message: excerpt,
            });
        }

        match response.json::<Value>().await {
            Ok(body) => Ok(body),
            Err(e) => {
                let err = FetcherError::transport(e);
                if let FetcherError::Transport { kind, .. } = &err {
                    metrics.record_transport_error(kind);
                }
                Err(err)
            }
        }
    }
}
