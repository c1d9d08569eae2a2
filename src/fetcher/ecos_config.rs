//! ECOS endpoint configuration
//!
//! Every ECOS path has the shape
//! `{base}/{service}/{token}/{format}/{language}/{start_index}/{end_index}/{segments...}`.
//! Only the service and trailing segments vary between calls.

/// Response format segment
pub const RESPONSE_FORMAT: &str = "json";

/// Language segment
pub const LANGUAGE: &str = "kr";

/// Result code for a successful query
pub const SUCCESS_CODE: &str = "INFO-000";

/// Result code ECOS returns when the query is valid but has no rows
pub const NO_DATA_CODE: &str = "INFO-200";

/// Hard ceiling on rows per request.
/// ECOS rejects end indexes above this, so larger windows are clamped.
pub const MAX_ROWS_PER_REQUEST: u32 = 1000;

/// Longest span in days for daily, monthly and quarterly queries.
/// 1826 days is five years including one leap day.
pub const MAX_SPAN_DAYS: i64 = 1826;

/// Rows requested when listing series tables
pub const TABLE_LIST_ROW_LIMIT: u32 = 1000;

/// ECOS services used by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EcosService {
    /// Time-series rows for one item
    StatisticSearch,
    /// Items of one series table
    StatisticItemList,
    /// All series tables
    StatisticTableList,
}

impl EcosService {
    /// Path segment naming the service
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StatisticSearch => "StatisticSearch",
            Self::StatisticItemList => "StatisticItemList",
            Self::StatisticTableList => "StatisticTableList",
        }
    }

    /// Whether responses are catalogue data (long TTL)
    pub fn is_catalogue(&self) -> bool {
        !matches!(self, Self::StatisticSearch)
    }
}

impl std::fmt::Display for EcosService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
