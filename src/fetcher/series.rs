//! Cache- and rate-limit-aware series fetcher
//!
//! Every upstream call follows the same path: consult the cache, and on a
//! miss wait for the rate limiter, issue the request, parse the envelope and
//! cache the body only if it holds rows. "No data" answers and errors are
//! never cached, so a retried window always reaches the upstream again.

use crate::cache::{ResponseCache, TtlClass};
use crate::fetcher::ecos_config::{MAX_ROWS_PER_REQUEST, MAX_SPAN_DAYS};
use crate::fetcher::ecos_parser::EcosParser;
use crate::fetcher::{FetcherError, FetcherResult, SeriesSource, Transport, UpstreamRequest};
use crate::gateway::config::{DEFAULT_CATALOGUE_TTL, DEFAULT_DATA_TTL, DEFAULT_DISCOVERY_ROW_LIMIT};
use crate::gateway::rate_limit::RateLimiter;
use crate::metrics;
use crate::period::{periods_in_span, span_days};
use crate::{CatalogueItem, RowWindow, SeriesQuery, SeriesResult, StatisticTable};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Cache lifetimes and listing sizes used by the fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPolicy {
    /// TTL for series responses
    pub data_ttl: Duration,
    /// TTL for item and table listings
    pub catalogue_ttl: Duration,
    /// Rows requested per item listing
    pub discovery_row_limit: u32,
}

impl FetchPolicy {
    /// TTL for a response class
    pub fn ttl(&self, class: TtlClass) -> Duration {
        match class {
            TtlClass::Data => self.data_ttl,
            TtlClass::Catalogue => self.catalogue_ttl,
        }
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            data_ttl: DEFAULT_DATA_TTL,
            catalogue_ttl: DEFAULT_CATALOGUE_TTL,
            discovery_row_limit: DEFAULT_DISCOVERY_ROW_LIMIT,
        }
    }
}

/// Validate a query and compute the row window to request
///
/// # Returns
/// The explicit window with its end clamped to the row ceiling, or
/// `1..=min(periods in span, ceiling)` when the query has none
///
/// # Errors
/// [`FetcherError::Validation`] for blank codes, `start > end`, spans over
/// 1826 days at non-annual granularities, and inverted or zero-based row windows
pub fn validate_query(query: &SeriesQuery) -> FetcherResult<RowWindow> {
    if query.series_code.trim().is_empty() || query.item_code.trim().is_empty() {
        return Err(FetcherError::Validation(
            "series code and item code are required".to_string(),
        ));
    }

    if query.start > query.end {
        return Err(FetcherError::Validation(format!(
            "start {} is after end {}",
            query.start, query.end
        )));
    }

    if query.granularity.is_span_limited() {
        let span = span_days(query.start, query.end);
        if span > MAX_SPAN_DAYS {
            return Err(FetcherError::Validation(format!(
                "span of {span} days exceeds the {MAX_SPAN_DAYS}-day limit for {} series",
                query.granularity.name()
            )));
        }
    }

    match query.rows {
        Some(rows) => {
            let end_index = rows.end_index.min(MAX_ROWS_PER_REQUEST);
            if rows.start_index == 0 || rows.start_index > end_index {
                return Err(FetcherError::Validation(format!(
                    "invalid row window {}..{}",
                    rows.start_index, rows.end_index
                )));
            }
            Ok(RowWindow::new(rows.start_index, end_index))
        }
        None => {
            let expected = periods_in_span(query.start, query.end, query.granularity)
                .clamp(1, u64::from(MAX_ROWS_PER_REQUEST));
            Ok(RowWindow::new(1, expected as u32))
        }
    }
}

/// [`SeriesSource`] backed by a [`Transport`], a shared cache and a shared limiter
pub struct SeriesFetcher {
    transport: Arc<dyn Transport>,
    cache: Arc<ResponseCache>,
    limiter: Arc<RateLimiter>,
    policy: FetchPolicy,
}

impl SeriesFetcher {
    /// Create a fetcher
    ///
    /// # Arguments
    /// * `transport` - Raw upstream access
    /// * `cache` - Response cache shared with the gateway
    /// * `limiter` - Rate limiter shared by every caller in the process
    /// * `policy` - TTLs and listing sizes
    pub fn new(
        transport: Arc<dyn Transport>,
        cache: Arc<ResponseCache>,
        limiter: Arc<RateLimiter>,
        policy: FetchPolicy,
    ) -> Self {
        Self {
            transport,
            cache,
            limiter,
            policy,
        }
    }

    /// Response cache
    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Rate limiter
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    async fn cached_or_fetch<T>(
        &self,
        request: &UpstreamRequest,
        parse: fn(&Value) -> FetcherResult<T>,
        is_empty: fn(&T) -> bool,
    ) -> FetcherResult<T> {
        let key = request.cache_key();
        let service = request.service.as_str();

        if let Some(body) = self.cache.get(&key) {
            metrics::record_cache_lookup(service, true);
            debug!(key = %key, "Cache hit");
            return parse(&body);
        }
        metrics::record_cache_lookup(service, false);
        debug!(key = %key, "Cache miss");

        self.limiter.acquire().await;
        let body = self.transport.get(request).await?;
        let parsed = parse(&body)?;

        if !is_empty(&parsed) {
            self.cache
                .set(key, body, self.policy.ttl(request.ttl_class()));
        }
        Ok(parsed)
    }
}

#[async_trait]
impl SeriesSource for SeriesFetcher {
    async fn fetch_series(&self, query: &SeriesQuery) -> FetcherResult<SeriesResult> {
        let rows = validate_query(query)?;
        let request = UpstreamRequest::statistic_search(query, rows);

        debug!(
            query = %query,
            start_index = rows.start_index,
            end_index = rows.end_index,
            "Fetching series"
        );

        match self
            .cached_or_fetch(&request, EcosParser::parse_series, SeriesResult::is_empty)
            .await
        {
            Err(FetcherError::NoDataForPeriod { code, .. }) => {
                debug!(query = %query, code = %code, "Upstream has no data for window");
                Ok(SeriesResult::empty())
            }
            other => other,
        }
    }

    async fn list_items(&self, series_code: &str) -> FetcherResult<Vec<CatalogueItem>> {
        if series_code.trim().is_empty() {
            return Err(FetcherError::Validation("series code is required".to_string()));
        }
        let request = UpstreamRequest::item_list(series_code, self.policy.discovery_row_limit);
        self.cached_or_fetch(&request, EcosParser::parse_item_list, |items| items.is_empty())
            .await
    }

    async fn list_tables(&self) -> FetcherResult<Vec<StatisticTable>> {
        let request = UpstreamRequest::table_list();
        self.cached_or_fetch(&request, EcosParser::parse_table_list, |tables| tables.is_empty())
            .await
    }
}
