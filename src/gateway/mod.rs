//! Gateway orchestration
//!
//! A [`Gateway`] owns one response cache, one rate limiter (inside its
//! series source) and one catalogue overlay. Callers construct it explicitly
//! and share it; there is no process-wide instance.

use crate::cache::{CacheStats, ResponseCache};
use crate::catalogue::{Catalogue, CatalogueError, CategorySummary, ItemSpec, ResolvedItem};
use crate::fetcher::client::build_http_client;
use crate::fetcher::ecos_http::EcosHttpClient;
use crate::fetcher::series::{FetchPolicy, SeriesFetcher};
use crate::fetcher::{FetcherError, SeriesSource, Transport};
use crate::metrics::IndicatorMetrics;
use crate::period::PeriodError;
use crate::stats::{self, StatsError, SummaryStats};
use crate::{Granularity, RowWindow, SeriesQuery, SeriesResult, StatisticTable};
use chrono::NaiveDate;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

pub mod config;
pub mod fallback;
pub mod rate_limit;
pub mod request;

pub use config::GatewayConfig;
pub use fallback::{fetch_with_fallback, FallbackOutcome, FallbackPolicy};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use request::IndicatorRequest;

/// Error taxonomy callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input, rejected before any upstream call
    Validation,
    /// Timeout, connection failure, non-2xx or undecodable body
    UpstreamTransport,
    /// Upstream result code other than success or "no data"
    UpstreamLogic,
    /// Upstream has no data for the window
    NoDataForPeriod,
    /// Category key not in the catalogue
    UnknownCategory,
    /// Item key or series not usable for the category
    UnknownItem,
    /// Nothing to summarize
    EmptySeries,
    /// Invalid gateway configuration
    Configuration,
}

impl ErrorKind {
    /// Stable snake_case name
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::UpstreamTransport => "upstream_transport",
            ErrorKind::UpstreamLogic => "upstream_logic",
            ErrorKind::NoDataForPeriod => "no_data_for_period",
            ErrorKind::UnknownCategory => "unknown_category",
            ErrorKind::UnknownItem => "unknown_item",
            ErrorKind::EmptySeries => "empty_series",
            ErrorKind::Configuration => "configuration",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gateway errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Malformed caller input
    #[error("invalid request: {0}")]
    Validation(String),

    /// Catalogue resolution failed
    #[error(transparent)]
    Catalogue(#[from] CatalogueError),

    /// Upstream fetch failed
    #[error(transparent)]
    Fetch(#[from] FetcherError),

    /// Summary could not be computed
    #[error(transparent)]
    Stats(#[from] StatsError),

    /// Configuration rejected
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<PeriodError> for GatewayError {
    fn from(err: PeriodError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl GatewayError {
    /// Taxonomy class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Validation(_) => ErrorKind::Validation,
            GatewayError::Configuration(_) => ErrorKind::Configuration,
            GatewayError::Stats(StatsError::EmptySeries) => ErrorKind::EmptySeries,
            GatewayError::Fetch(err) => fetch_kind(err),
            GatewayError::Catalogue(err) => match err {
                CatalogueError::UnknownCategory(_) => ErrorKind::UnknownCategory,
                CatalogueError::UnknownItem { .. }
                | CatalogueError::UnknownSeries { .. }
                | CatalogueError::NoItems { .. } => ErrorKind::UnknownItem,
                CatalogueError::Discovery { source, .. } => fetch_kind(source),
                CatalogueError::Parse(_) => ErrorKind::Configuration,
            },
        }
    }
}

fn fetch_kind(err: &FetcherError) -> ErrorKind {
    match err {
        FetcherError::Validation(_) | FetcherError::Unsupported(_) => ErrorKind::Validation,
        FetcherError::Transport { .. } => ErrorKind::UpstreamTransport,
        FetcherError::Upstream { .. } => ErrorKind::UpstreamLogic,
        FetcherError::NoDataForPeriod { .. } => ErrorKind::NoDataForPeriod,
    }
}

/// A fetched indicator with the identifiers it resolved to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndicatorSeries {
    /// Category key
    pub category: String,
    /// Item key, as selected
    pub item_key: String,
    /// Item display name
    pub item_name: String,
    /// Series (table) code
    pub series_code: String,
    /// Upstream item code
    pub item_code: String,
    /// Granularity requested from the upstream
    pub granularity: Granularity,
    /// First day of the window
    pub start: NaiveDate,
    /// Last day the caller asked for
    pub requested_end: NaiveDate,
    /// Last day of the window that produced `result`
    pub effective_end: NaiveDate,
    /// End-date shifts taken by the fallback driver
    pub fallback_steps: u32,
    /// Rows
    pub result: SeriesResult,
}

/// Usable items of a category at one granularity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryDescription {
    /// Category key
    pub category: String,
    /// Category metadata
    pub summary: CategorySummary,
    /// Granularity the items were filtered for
    pub granularity: Granularity,
    /// True when no item matched the granularity and all items are listed
    pub relaxed: bool,
    /// Caller aliases mapping to item codes
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, String>,
    /// Items by key
    pub items: BTreeMap<String, ItemSpec>,
}

/// Statistics gateway
pub struct Gateway {
    source: Arc<dyn SeriesSource>,
    cache: Arc<ResponseCache>,
    catalogue: Catalogue,
    fallback_max_retries: u32,
    set_concurrency: usize,
}

impl Gateway {
    /// Create a gateway talking to ECOS over HTTP
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid, the HTTP client
    /// cannot be built or the embedded catalogue fails to load.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        config.validate()?;
        let client = build_http_client(&config.http)?;
        let transport = EcosHttpClient::new(
            client,
            config.base_url.clone(),
            config.access_token.clone(),
        );
        Self::with_transport(&config, Arc::new(transport))
    }

    /// Create a gateway over any transport, with its own cache and limiter
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the embedded
    /// catalogue fails to load.
    pub fn with_transport(
        config: &GatewayConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, GatewayError> {
        config.validate()?;
        let cache = Arc::new(ResponseCache::new());
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        let policy = FetchPolicy {
            data_ttl: config.data_ttl,
            catalogue_ttl: config.catalogue_ttl,
            discovery_row_limit: config.discovery_row_limit,
        };
        let fetcher = SeriesFetcher::new(transport, cache.clone(), limiter, policy);

        Ok(Self::from_parts(Arc::new(fetcher), cache, Catalogue::embedded()?)
            .with_fallback_max_retries(config.fallback_max_retries)
            .with_set_concurrency(config.set_concurrency))
    }

    /// Assemble a gateway from prepared parts
    ///
    /// `cache` should be the cache `source` writes to, so that cache
    /// operations on the gateway reach it.
    pub fn from_parts(
        source: Arc<dyn SeriesSource>,
        cache: Arc<ResponseCache>,
        catalogue: Catalogue,
    ) -> Self {
        Self {
            source,
            cache,
            catalogue,
            fallback_max_retries: config::DEFAULT_FALLBACK_MAX_RETRIES,
            set_concurrency: config::DEFAULT_SET_CONCURRENCY,
        }
    }

    /// Override the fallback retry budget
    pub fn with_fallback_max_retries(mut self, max_retries: u32) -> Self {
        self.fallback_max_retries = max_retries;
        self
    }

    /// Override the per-set fetch concurrency (minimum 1)
    pub fn with_set_concurrency(mut self, concurrency: usize) -> Self {
        self.set_concurrency = concurrency.max(1);
        self
    }

    /// Catalogue with its discovered overlay
    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    /// Fetch one indicator
    ///
    /// Lag-prone category/granularity pairs go through the fallback driver;
    /// everything else is fetched once.
    ///
    /// # Errors
    /// Validation, catalogue and hard upstream errors. "No data" is not an
    /// error: it yields an empty series.
    pub async fn fetch_indicator(
        &self,
        request: &IndicatorRequest,
    ) -> Result<IndicatorSeries, GatewayError> {
        let metrics = IndicatorMetrics::start(
            &request.category,
            request.item.as_deref().unwrap_or("default"),
        );

        let outcome = self.fetch_single(request).await;
        observe(&metrics, outcome)
    }

    /// Fetch several items of one category concurrently
    ///
    /// # Arguments
    /// * `request` - Category, granularity, series and dates; its item is ignored
    /// * `item_keys` - Items to fetch; every usable item when empty
    ///
    /// # Returns
    /// One entry per item key. Unknown keys and per-item failures are
    /// entries, not errors.
    ///
    /// # Errors
    /// Invalid dates or a category/table that cannot be resolved at all
    pub async fn fetch_indicator_set(
        &self,
        request: &IndicatorRequest,
        item_keys: &[String],
    ) -> Result<BTreeMap<String, Result<IndicatorSeries, GatewayError>>, GatewayError> {
        let (start, end) = request.date_range()?;
        let table = self
            .catalogue
            .resolve_table(
                self.source.as_ref(),
                &request.category,
                request.granularity,
                request.series.as_deref(),
            )
            .await?;

        let keys = if item_keys.is_empty() {
            table.item_keys()
        } else {
            item_keys.to_vec()
        };
        info!(
            category = %request.category,
            series = %table.series_code,
            items = keys.len(),
            concurrency = self.set_concurrency,
            "Fetching indicator set"
        );

        let table = &table;
        let results = stream::iter(keys)
            .map(|key| async move {
                let metrics = IndicatorMetrics::start(&request.category, &key);
                let outcome = match table.select(Some(&key)) {
                    Ok(item) => self.fetch_resolved(item, start, end, request.rows).await,
                    Err(e) => Err(e.into()),
                };
                (key, observe(&metrics, outcome))
            })
            .buffer_unordered(self.set_concurrency)
            .collect::<BTreeMap<_, _>>()
            .await;

        Ok(results)
    }

    async fn fetch_single(
        &self,
        request: &IndicatorRequest,
    ) -> Result<IndicatorSeries, GatewayError> {
        let (start, end) = request.date_range()?;
        let item = self
            .catalogue
            .resolve(
                self.source.as_ref(),
                &request.selection(request.item.as_deref()),
            )
            .await?;
        self.fetch_resolved(item, start, end, request.rows).await
    }

    async fn fetch_resolved(
        &self,
        item: ResolvedItem,
        start: NaiveDate,
        end: NaiveDate,
        rows: Option<RowWindow>,
    ) -> Result<IndicatorSeries, GatewayError> {
        let mut query = SeriesQuery::new(
            item.series_code.clone(),
            item.item_code.clone(),
            item.granularity,
            start,
            end,
        );
        if let Some(rows) = rows {
            query = query.with_rows(rows);
        }

        let outcome = match item.lag_step_months {
            Some(step_months) => {
                let policy = FallbackPolicy {
                    step_months,
                    max_retries: self.fallback_max_retries,
                };
                fetch_with_fallback(self.source.as_ref(), &query, &policy).await?
            }
            None => {
                let result = match self.source.fetch_series(&query).await {
                    Err(e) if e.is_no_data() => {
                        debug!(query = %query, "No data for window");
                        SeriesResult::empty()
                    }
                    other => other?,
                };
                FallbackOutcome {
                    result,
                    effective_end: end,
                    steps: 0,
                }
            }
        };

        Ok(IndicatorSeries {
            category: item.category,
            item_key: item.item_key,
            item_name: item.item_name,
            series_code: item.series_code,
            item_code: item.item_code,
            granularity: item.granularity,
            start,
            requested_end: end,
            effective_end: outcome.effective_end,
            fallback_steps: outcome.steps,
            result: outcome.result,
        })
    }

    /// Summary with `previous` as the second-to-last point
    ///
    /// # Errors
    /// [`StatsError::EmptySeries`] when no point has a positive numeric value
    pub fn summarize(&self, result: &SeriesResult) -> Result<SummaryStats, GatewayError> {
        Ok(stats::summarize(result)?)
    }

    /// Summary with `previous` as the first point of the window
    ///
    /// # Errors
    /// [`StatsError::EmptySeries`] when no point has a positive numeric value
    pub fn summarize_over_window(
        &self,
        result: &SeriesResult,
    ) -> Result<SummaryStats, GatewayError> {
        Ok(stats::summarize_over_window(result)?)
    }

    /// Metadata for every category
    pub fn list_categories(&self) -> BTreeMap<String, CategorySummary> {
        self.catalogue.summaries()
    }

    /// Usable items of one category, discovering them if needed
    ///
    /// # Errors
    /// Unknown category, failed discovery or an empty table
    pub async fn describe_category(
        &self,
        category: &str,
        granularity: Option<Granularity>,
    ) -> Result<CategoryDescription, GatewayError> {
        let table = self
            .catalogue
            .resolve_table(self.source.as_ref(), category, granularity, None)
            .await?;
        let mapping = self.catalogue.category(category)?;
        let summary = self
            .catalogue
            .summaries()
            .remove(category)
            .ok_or_else(|| CatalogueError::UnknownCategory(category.to_string()))?;

        Ok(CategoryDescription {
            category: category.to_string(),
            summary,
            granularity: table.granularity,
            relaxed: table.relaxed,
            aliases: mapping.aliases.clone(),
            items: table.items,
        })
    }

    /// Upstream series tables whose code and name contain the given keywords
    ///
    /// Matching is a case-insensitive substring test. An absent keyword
    /// matches everything.
    ///
    /// # Errors
    /// Transport or upstream errors from the table listing
    pub async fn search_tables(
        &self,
        code_keyword: Option<&str>,
        name_keyword: Option<&str>,
    ) -> Result<Vec<StatisticTable>, GatewayError> {
        let contains = |haystack: &str, needle: Option<&str>| {
            needle.map_or(true, |needle| {
                haystack.to_lowercase().contains(&needle.to_lowercase())
            })
        };

        let tables = self.source.list_tables().await?;
        let total = tables.len();
        let matches: Vec<StatisticTable> = tables
            .into_iter()
            .filter(|table| {
                contains(&table.series_code, code_keyword) && contains(&table.name, name_keyword)
            })
            .collect();

        debug!(total, matched = matches.len(), "Searched series tables");
        Ok(matches)
    }

    /// Response cache counters
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop every cached response
    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("Response cache cleared");
    }

    /// Drop expired cache entries now, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        self.cache.purge_expired()
    }
}

fn observe(
    metrics: &IndicatorMetrics,
    outcome: Result<IndicatorSeries, GatewayError>,
) -> Result<IndicatorSeries, GatewayError> {
    match &outcome {
        Ok(series) => metrics.record_success(series.result.len(), series.fallback_steps),
        Err(e) => metrics.record_failure(&e.to_string()),
    }
    outcome
}
