//! # Statistics Gateway Library
//!
//! A client for the Bank of Korea ECOS statistics API that fetches economic
//! time series while protecting the upstream request budget.
//!
//! ## Features
//!
//! - **Rate Limiting**: minimum spacing between requests plus a rolling-window budget
//! - **Response Caching**: in-memory TTL cache with separate data and catalogue lifetimes
//! - **Catalogue Discovery**: categories without a static item table are discovered once per run
//! - **Publication-Lag Fallback**: lag-prone series walk their end date back until data appears
//! - **Summary Statistics**: high/low/average/current/previous/change over a fetched series
//!
//! ## Quick Start
//!
//! ```no_run
//! use statistics_gateway::{Gateway, GatewayConfig, IndicatorRequest, Granularity};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = Gateway::new(GatewayConfig::from_env()?)?;
//!
//! // Monthly trade figures for the first half of 2024
//! let request = IndicatorRequest::new("trade", "20240101", "20240630")
//!     .item("EXPORT_USD")
//!     .granularity(Granularity::Monthly);
//!
//! let series = gateway.fetch_indicator(&request).await?;
//! let summary = gateway.summarize(&series.result)?;
//! println!("{} latest: {}", series.item_key, summary.current);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`period`] - Period labels and month arithmetic
//! - [`gateway`] - The gateway instance, rate limiter and fallback driver
//! - [`cache`] - TTL response cache
//! - [`catalogue`] - Static category tables, discovered overlay and item resolution
//! - [`fetcher`] - Upstream transport, envelope parsing and the series fetcher
//! - [`stats`] - Summary statistics
//! - [`output`] - CSV writers for fetched series

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// TTL response cache
pub mod cache;

/// Category tables and item resolution
pub mod catalogue;

/// CLI command implementations
pub mod cli;

/// Upstream fetchers
pub mod fetcher;

/// Gateway orchestration
pub mod gateway;

/// Metrics collection and Prometheus export
pub mod metrics;

/// Series output writers
pub mod output;

/// Period labels and calendar arithmetic
pub mod period;

/// Summary statistics
pub mod stats;

pub use gateway::{
    ErrorKind, Gateway, GatewayConfig, GatewayError, IndicatorRequest, IndicatorSeries,
};
pub use stats::SummaryStats;

/// Sampling period of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Granularity {
    /// One observation per day
    #[serde(rename = "D")]
    Daily,
    /// One observation per month
    #[serde(rename = "M")]
    Monthly,
    /// One observation per quarter
    #[serde(rename = "Q")]
    Quarterly,
    /// One observation per year
    #[serde(rename = "A", alias = "Y")]
    Annual,
}

impl Granularity {
    /// All granularities, finest first
    pub const ALL: [Granularity; 4] = [
        Granularity::Daily,
        Granularity::Monthly,
        Granularity::Quarterly,
        Granularity::Annual,
    ];

    /// Cycle code used in upstream paths
    pub fn code(&self) -> &'static str {
        match self {
            Granularity::Daily => "D",
            Granularity::Monthly => "M",
            Granularity::Quarterly => "Q",
            Granularity::Annual => "A",
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Granularity::Daily => "daily",
            Granularity::Monthly => "monthly",
            Granularity::Quarterly => "quarterly",
            Granularity::Annual => "annual",
        }
    }

    /// Months to step back per fallback retry, for granularities that lag
    pub fn lag_step_months(&self) -> Option<u32> {
        match self {
            Granularity::Monthly => Some(1),
            Granularity::Quarterly => Some(3),
            Granularity::Daily | Granularity::Annual => None,
        }
    }

    /// Whether requests at this granularity are subject to the span ceiling
    ///
    /// Annual spans are bounded by the row ceiling instead.
    pub fn is_span_limited(&self) -> bool {
        !matches!(self, Granularity::Annual)
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "D" | "DAILY" => Ok(Granularity::Daily),
            "M" | "MONTHLY" => Ok(Granularity::Monthly),
            "Q" | "QUARTERLY" => Ok(Granularity::Quarterly),
            "A" | "Y" | "ANNUAL" | "YEARLY" => Ok(Granularity::Annual),
            _ => Err(format!("Invalid granularity: {s}")),
        }
    }
}

/// Explicit pagination window (1-based, inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowWindow {
    /// First row to return
    pub start_index: u32,
    /// Last row to return
    pub end_index: u32,
}

impl RowWindow {
    /// Create a row window
    pub fn new(start_index: u32, end_index: u32) -> Self {
        Self {
            start_index,
            end_index,
        }
    }
}

/// A fully-resolved, upstream-shaped series request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesQuery {
    /// Upstream series (table) code, e.g. "731Y001"
    pub series_code: String,
    /// Upstream item code within the series, e.g. "0000001"
    pub item_code: String,
    /// Sampling period
    pub granularity: Granularity,
    /// First day of the requested window
    pub start: NaiveDate,
    /// Last day of the requested window
    pub end: NaiveDate,
    /// Explicit pagination window; computed from the span when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<RowWindow>,
}

impl SeriesQuery {
    /// Create a query with an automatically sized row window
    pub fn new(
        series_code: impl Into<String>,
        item_code: impl Into<String>,
        granularity: Granularity,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        Self {
            series_code: series_code.into(),
            item_code: item_code.into(),
            granularity,
            start,
            end,
            rows: None,
        }
    }

    /// Use an explicit pagination window
    pub fn with_rows(mut self, rows: RowWindow) -> Self {
        self.rows = Some(rows);
        self
    }

    /// Copy of this query ending at `end`
    pub fn with_end(&self, end: NaiveDate) -> Self {
        Self {
            end,
            ..self.clone()
        }
    }

    /// Start formatted for the upstream at this query's granularity
    pub fn formatted_start(&self) -> String {
        period::format_for_granularity(self.start, self.granularity)
    }

    /// End formatted for the upstream at this query's granularity
    pub fn formatted_end(&self) -> String {
        period::format_for_granularity(self.end, self.granularity)
    }
}

impl std::fmt::Display for SeriesQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} [{}] {}..{}",
            self.series_code,
            self.item_code,
            self.granularity,
            self.formatted_start(),
            self.formatted_end()
        )
    }
}

/// One observation of a series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Upstream period label (`YYYYMMDD`, `YYYYMM`, `YYYYQn` or `YYYY`)
    pub period: String,
    /// Raw value as published; may be blank or non-numeric
    pub value: Option<String>,
    /// Item display name reported by the upstream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    /// Unit reported by the upstream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl SeriesPoint {
    /// Create a point with only a period and a raw value
    pub fn new(period: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            period: period.into(),
            value: Some(value.into()),
            item_name: None,
            unit: None,
        }
    }

    /// Value parsed as a decimal, if it is numeric
    pub fn numeric_value(&self) -> Option<Decimal> {
        let raw = self.value.as_deref()?.trim();
        if !raw.bytes().any(|b| b.is_ascii_digit()) {
            return None;
        }
        Decimal::from_str(raw)
            .or_else(|_| Decimal::from_scientific(raw))
            .ok()
    }
}

/// Rows returned for one series request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesResult {
    /// Observations in upstream order
    pub points: Vec<SeriesPoint>,
    /// Total row count advertised by the upstream
    pub total_count: u64,
}

impl SeriesResult {
    /// A result with no rows, as returned for "no data for this query"
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the result has no rows
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.points.len()
    }
}

/// An item row from the upstream's item-listing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueItem {
    /// Upstream item code
    pub item_code: String,
    /// Display name
    pub item_name: String,
    /// Native granularity, if the upstream reported a known cycle
    pub granularity: Option<Granularity>,
}

/// A series table row from the upstream's table-listing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticTable {
    /// Series (table) code
    pub series_code: String,
    /// Table name
    pub name: String,
    /// Native granularity, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granularity: Option<Granularity>,
    /// Publishing organisation, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organisation: Option<String>,
}
