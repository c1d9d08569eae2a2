//! Observability metrics for the statistics gateway
//!
//! Tracks upstream request volume and latency, cache effectiveness, rate
//! limiter pressure, fallback retries and catalogue discovery.
//!
//! ## Architecture
//!
//! - Uses the `metrics` facade; recording is a no-op until a recorder is installed
//! - Prometheus exporter is installed only when the CLI is given `--metrics-addr`
//! - Helpers here are the only place metric names are spelled out

use crate::fetcher::TransportErrorKind;
use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Global metrics registry initialization flag
static METRICS_INITIALIZED: Lazy<Arc<RwLock<bool>>> = Lazy::new(|| Arc::new(RwLock::new(false)));

/// Correlation ID generator for request tracing
static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Initialize metrics system with Prometheus exporter
///
/// Idempotent: later calls are no-ops.
///
/// # Arguments
/// * `addr` - Socket address to bind the Prometheus scrape endpoint
///
/// # Returns
/// Ok(()) if metrics initialized successfully, Err if binding fails
pub async fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "upstream_requests_total",
        Unit::Count,
        "Total number of HTTP requests made to ECOS"
    );

    describe_histogram!(
        "upstream_request_duration_seconds",
        Unit::Seconds,
        "ECOS request duration in seconds"
    );

    describe_counter!(
        "cache_lookups_total",
        Unit::Count,
        "Response cache lookups by result (hit/miss)"
    );

    describe_histogram!(
        "rate_limit_wait_seconds",
        Unit::Seconds,
        "Time spent waiting for the rate limiter"
    );

    describe_gauge!(
        "rate_limit_window_requests",
        Unit::Count,
        "Requests recorded in the current rolling window"
    );

    describe_counter!(
        "fallback_steps_total",
        Unit::Count,
        "End-date shifts performed for publication-lagged series"
    );

    describe_counter!(
        "catalogue_discoveries_total",
        Unit::Count,
        "Item-listing discovery calls by outcome"
    );

    describe_counter!(
        "indicator_fetches_total",
        Unit::Count,
        "Indicator fetches by outcome"
    );

    *initialized = true;
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Check if metrics system is initialized
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.read().await
}

/// Generate a new correlation ID for request tracing
pub fn generate_correlation_id() -> String {
    let id = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("req-{id:08x}")
}

/// Record an upstream HTTP request with timing
pub struct HttpRequestMetrics {
    service: String,
    start_time: Instant,
    correlation_id: String,
}

impl HttpRequestMetrics {
    /// Start recording a request to `service`
    pub fn start(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            start_time: Instant::now(),
            correlation_id: generate_correlation_id(),
        }
    }

    /// Record completion with an HTTP status
    pub fn record_complete(&self, status_code: u16) {
        let duration = self.start_time.elapsed();

        counter!(
            "upstream_requests_total",
            "service" => self.service.clone(),
            "status" => status_code.to_string(),
        )
        .increment(1);

        histogram!(
            "upstream_request_duration_seconds",
            "service" => self.service.clone(),
        )
        .record(duration.as_secs_f64());

        debug!(
            correlation_id = %self.correlation_id,
            service = %self.service,
            status = status_code,
            duration_ms = duration.as_millis() as u64,
            "Upstream request completed"
        );
    }

    /// Record a failure that produced no status code
    pub fn record_transport_error(&self, kind: &TransportErrorKind) {
        let duration = self.start_time.elapsed();

        counter!(
            "upstream_requests_total",
            "service" => self.service.clone(),
            "status" => kind.metric_label(),
        )
        .increment(1);

        histogram!(
            "upstream_request_duration_seconds",
            "service" => self.service.clone(),
        )
        .record(duration.as_secs_f64());

        warn!(
            correlation_id = %self.correlation_id,
            service = %self.service,
            error = %kind,
            duration_ms = duration.as_millis() as u64,
            "Upstream transport error"
        );
    }

    /// Correlation ID for this request
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

/// Record a cache lookup for `service`
pub fn record_cache_lookup(service: &str, hit: bool) {
    counter!(
        "cache_lookups_total",
        "service" => service.to_string(),
        "result" => if hit { "hit" } else { "miss" },
    )
    .increment(1);
}

/// Rate limiter wait measurement
pub struct RateLimiterMetrics {
    start_time: Instant,
}

impl RateLimiterMetrics {
    /// Start measuring the wait
    pub fn start() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    /// Record a granted slot and the window occupancy after it
    pub fn record_acquired(&self, window_requests: usize, max_per_window: usize) {
        let wait = self.start_time.elapsed();

        histogram!("rate_limit_wait_seconds").record(wait.as_secs_f64());
        gauge!("rate_limit_window_requests").set(window_requests as f64);

        if window_requests * 5 >= max_per_window * 4 {
            warn!(
                window_requests,
                max_per_window, "Rate limit window usage exceeds 80%"
            );
        }
    }
}

/// Record one fallback end-date shift
pub fn record_fallback_step(series_code: &str, step: u32) {
    counter!(
        "fallback_steps_total",
        "series" => series_code.to_string(),
    )
    .increment(1);

    debug!(series = %series_code, step, "Fallback step recorded");
}

/// Record a discovery call outcome
pub fn record_discovery(series_code: &str, succeeded: bool) {
    counter!(
        "catalogue_discoveries_total",
        "series" => series_code.to_string(),
        "outcome" => if succeeded { "ok" } else { "error" },
    )
    .increment(1);
}

/// Indicator fetch metrics
pub struct IndicatorMetrics {
    category: String,
    item_key: String,
    start_time: Instant,
}

impl IndicatorMetrics {
    /// Start tracking an indicator fetch
    pub fn start(category: impl Into<String>, item_key: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            item_key: item_key.into(),
            start_time: Instant::now(),
        }
    }

    /// Record a completed fetch
    pub fn record_success(&self, points: usize, fallback_steps: u32) {
        let duration = self.start_time.elapsed();
        let outcome = if points == 0 { "empty" } else { "ok" };

        counter!(
            "indicator_fetches_total",
            "category" => self.category.clone(),
            "outcome" => outcome,
        )
        .increment(1);

        info!(
            category = %self.category,
            item = %self.item_key,
            points,
            fallback_steps,
            duration_ms = duration.as_millis() as u64,
            "Indicator fetched"
        );
    }

    /// Record a failed fetch
    pub fn record_failure(&self, error: &str) {
        let duration = self.start_time.elapsed();

        counter!(
            "indicator_fetches_total",
            "category" => self.category.clone(),
            "outcome" => "error",
        )
        .increment(1);

        warn!(
            category = %self.category,
            item = %self.item_key,
            error = %error,
            duration_ms = duration.as_millis() as u64,
            "Indicator fetch failed"
        );
    }
}
