//! Gateway configuration constants and settings

use crate::gateway::rate_limit::RateLimitConfig;
use crate::gateway::GatewayError;
use std::time::Duration;

/// Default ECOS API base URL.
pub const DEFAULT_BASE_URL: &str = "https://ecos.bok.or.kr/api";

/// Environment variable holding the ECOS access token.
pub const ACCESS_TOKEN_ENV: &str = "ECOS_API_KEY";

/// Environment variable overriding the base URL.
pub const BASE_URL_ENV: &str = "ECOS_BASE_URL";

/// Per-request HTTP timeout.
/// Large monthly and daily windows can take ECOS well over ten seconds to
/// serialise, 30 seconds covers the slowest observed responses.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimum spacing between upstream requests.
/// ECOS throttles bursts well below its published quota; 800ms keeps a
/// sequential caller at roughly 75 requests per minute.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(800);

/// Length of the rolling request-budget window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(180);

/// Maximum requests per rolling window (250 per 3 minutes).
pub const DEFAULT_MAX_PER_WINDOW: u32 = 250;

/// TTL for series data responses.
/// Most indicators publish at most daily, 5 minutes keeps intraday re-runs cheap.
pub const DEFAULT_DATA_TTL: Duration = Duration::from_secs(300);

/// TTL for catalogue (item and table listing) responses.
pub const DEFAULT_CATALOGUE_TTL: Duration = Duration::from_secs(3600);

/// Fallback retries after the initial attempt for publication-lagged series.
/// 6 monthly steps covers half a year of lag, 6 quarterly steps covers 18 months.
pub const DEFAULT_FALLBACK_MAX_RETRIES: u32 = 6;

/// Rows requested from the item-listing endpoint during discovery.
pub const DEFAULT_DISCOVERY_ROW_LIMIT: u32 = 300;

/// Concurrent per-item fetches in a set request.
pub const DEFAULT_SET_CONCURRENCY: usize = 4;

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Whole-request timeout
    pub request_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// Complete gateway configuration
#[derive(Clone)]
pub struct GatewayConfig {
    /// ECOS base URL without trailing slash
    pub base_url: String,
    /// ECOS access token; never logged
    pub access_token: String,
    /// HTTP client settings
    pub http: HttpConfig,
    /// Rate limiter settings
    pub rate_limit: RateLimitConfig,
    /// TTL for series data responses
    pub data_ttl: Duration,
    /// TTL for catalogue responses
    pub catalogue_ttl: Duration,
    /// Fallback retries after the initial attempt
    pub fallback_max_retries: u32,
    /// Rows requested per discovery call
    pub discovery_row_limit: u32,
    /// Concurrent fetches per set request
    pub set_concurrency: usize,
}

impl GatewayConfig {
    /// Create a configuration with default settings and the given token
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token: access_token.into(),
            http: HttpConfig::default(),
            rate_limit: RateLimitConfig::default(),
            data_ttl: DEFAULT_DATA_TTL,
            catalogue_ttl: DEFAULT_CATALOGUE_TTL,
            fallback_max_retries: DEFAULT_FALLBACK_MAX_RETRIES,
            discovery_row_limit: DEFAULT_DISCOVERY_ROW_LIMIT,
            set_concurrency: DEFAULT_SET_CONCURRENCY,
        }
    }

    /// Build a configuration from `ECOS_API_KEY` and optional `ECOS_BASE_URL`
    ///
    /// # Errors
    /// Returns [`GatewayError::Configuration`] if the token variable is unset or empty.
    pub fn from_env() -> Result<Self, GatewayError> {
        let token = std::env::var(ACCESS_TOKEN_ENV).unwrap_or_default();
        let mut config = Self::new(token);
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            config = config.with_base_url(base_url);
        }
        config.validate()?;
        Ok(config)
    }

    /// Override the base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Check the configuration for values that would stall or misbehave
    ///
    /// # Errors
    /// Returns [`GatewayError::Configuration`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), GatewayError> {
        let invalid = |msg: &str| Err(GatewayError::Configuration(msg.to_string()));

        if self.access_token.trim().is_empty() {
            return invalid("access token is empty (set ECOS_API_KEY)");
        }
        if self.base_url.trim().is_empty() {
            return invalid("base URL is empty");
        }
        if self.rate_limit.max_per_window == 0 {
            return invalid("max requests per window must be at least 1");
        }
        if self.rate_limit.window.is_zero() {
            return invalid("rate limit window must be non-zero");
        }
        if self.data_ttl.is_zero() || self.catalogue_ttl.is_zero() {
            return invalid("cache TTLs must be non-zero");
        }
        if self.http.request_timeout.is_zero() {
            return invalid("request timeout must be non-zero");
        }
        if self.discovery_row_limit == 0 {
            return invalid("discovery row limit must be at least 1");
        }
        if self.set_concurrency == 0 {
            return invalid("set concurrency must be at least 1");
        }
        Ok(())
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("access_token", &"<redacted>")
            .field("http", &self.http)
            .field("rate_limit", &self.rate_limit)
            .field("data_ttl", &self.data_ttl)
            .field("catalogue_ttl", &self.catalogue_ttl)
            .field("fallback_max_retries", &self.fallback_max_retries)
            .field("discovery_row_limit", &self.discovery_row_limit)
            .field("set_concurrency", &self.set_concurrency)
            .finish()
    }
}
