//! Caller-facing indicator request

use crate::catalogue::ItemSelection;
use crate::gateway::GatewayError;
use crate::period::parse_date;
use crate::{Granularity, RowWindow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Request for one indicator, or for a set of items in one category
///
/// Dates are `YYYYMMDD` strings; they are reformatted for the resolved
/// granularity before reaching the upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorRequest {
    /// Category key
    pub category: String,
    /// Item key, alias or upstream code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    /// Granularity; the category default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granularity: Option<Granularity>,
    /// Alternate series override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    /// First day, `YYYYMMDD`
    pub start: String,
    /// Last day, `YYYYMMDD`
    pub end: String,
    /// Explicit pagination window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<RowWindow>,
}

impl IndicatorRequest {
    /// Create a request for the category's default item and granularity
    pub fn new(
        category: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            item: None,
            granularity: None,
            series: None,
            start: start.into(),
            end: end.into(),
            rows: None,
        }
    }

    /// Select an item
    pub fn item(mut self, item: impl Into<String>) -> Self {
        self.item = Some(item.into());
        self
    }

    /// Select a granularity
    pub fn granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = Some(granularity);
        self
    }

    /// Select an alternate series of the category
    pub fn series(mut self, series: impl Into<String>) -> Self {
        self.series = Some(series.into());
        self
    }

    /// Request an explicit row window
    pub fn rows(mut self, rows: RowWindow) -> Self {
        self.rows = Some(rows);
        self
    }

    /// Parse and order-check the date range
    ///
    /// # Errors
    /// [`GatewayError::Validation`] for malformed dates or `start > end`
    pub fn date_range(&self) -> Result<(NaiveDate, NaiveDate), GatewayError> {
        let start = parse_date(&self.start)?;
        let end = parse_date(&self.end)?;
        if start > end {
            return Err(GatewayError::Validation(format!(
                "start date {} must be on or before end date {}",
                self.start, self.end
            )));
        }
        Ok((start, end))
    }

    /// Catalogue selection for this request with `item_key` in place of the item
    pub(crate) fn selection<'a>(&'a self, item_key: Option<&'a str>) -> ItemSelection<'a> {
        ItemSelection {
            category: &self.category,
            item_key,
            granularity: self.granularity,
            series_code: self.series.as_deref(),
        }
    }
}
