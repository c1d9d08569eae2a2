//! Upstream request descriptors
//!
//! An [`UpstreamRequest`] is everything needed to build an ECOS URL except
//! the base URL and the access token, which the transport adds. Cache keys
//! are derived from the descriptor, so they never contain the token.

use crate::cache::TtlClass;
use crate::fetcher::ecos_config::{EcosService, LANGUAGE, RESPONSE_FORMAT, TABLE_LIST_ROW_LIMIT};
use crate::{RowWindow, SeriesQuery};

/// Placeholder written where the token goes in logged paths
const REDACTED: &str = "***";

/// One ECOS call, minus base URL and credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    /// Service to call
    pub service: EcosService,
    /// Row window
    pub rows: RowWindow,
    /// Path segments after the row window
    pub segments: Vec<String>,
    trailing_slash: bool,
}

impl UpstreamRequest {
    /// Series rows for a resolved query
    pub fn statistic_search(query: &SeriesQuery, rows: RowWindow) -> Self {
        Self {
            service: EcosService::StatisticSearch,
            rows,
            segments: vec![
                query.series_code.clone(),
                query.granularity.code().to_string(),
                query.formatted_start(),
                query.formatted_end(),
                query.item_code.clone(),
            ],
            trailing_slash: false,
        }
    }

    /// Item listing for one series table
    pub fn item_list(series_code: &str, limit: u32) -> Self {
        Self {
            service: EcosService::StatisticItemList,
            rows: RowWindow::new(1, limit.max(1)),
            segments: vec![series_code.to_string()],
            trailing_slash: true,
        }
    }

    /// Listing of all series tables
    pub fn table_list() -> Self {
        Self {
            service: EcosService::StatisticTableList,
            rows: RowWindow::new(1, TABLE_LIST_ROW_LIMIT),
            segments: Vec::new(),
            trailing_slash: true,
        }
    }

    /// Full URL including the token
    pub fn url(&self, base_url: &str, access_token: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.path(access_token))
    }

    /// Path with the token masked, for logs
    pub fn redacted_path(&self) -> String {
        self.path(REDACTED)
    }

    /// Deterministic cache key built from the resolved parameters
    pub fn cache_key(&self) -> String {
        let mut key = format!(
            "{}:{}:{}",
            self.service, self.rows.start_index, self.rows.end_index
        );
        for segment in &self.segments {
            key.push(':');
            key.push_str(segment);
        }
        key
    }

    /// TTL class of the response
    pub fn ttl_class(&self) -> TtlClass {
        if self.service.is_catalogue() {
            TtlClass::Catalogue
        } else {
            TtlClass::Data
        }
    }

    fn path(&self, token: &str) -> String {
        let mut path = format!(
            "{}/{}/{}/{}/{}/{}",
            self.service,
            token,
            RESPONSE_FORMAT,
            LANGUAGE,
            self.rows.start_index,
            self.rows.end_index
        );
        for segment in &self.segments {
            path.push('/');
            path.push_str(segment);
        }
        if self.trailing_slash {
            path.push('/');
        }
        path
    }
}
