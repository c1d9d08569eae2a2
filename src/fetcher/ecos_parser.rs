//! ECOS response parser
//!
//! Stateless functions converting ECOS JSON envelopes into typed results.
//! An envelope carries either a `RESULT{CODE,MESSAGE}` pair (at the top level
//! or nested under the service key) or a service object with
//! `list_total_count` and `row`.

use crate::fetcher::ecos_config::{EcosService, NO_DATA_CODE, SUCCESS_CODE};
use crate::fetcher::{FetcherError, FetcherResult};
use crate::{CatalogueItem, Granularity, SeriesPoint, SeriesResult, StatisticTable};
use serde_json::Value;
use tracing::debug;

/// Stateless parser for ECOS responses
pub struct EcosParser;

impl EcosParser {
    /// Check the envelope's result code
    ///
    /// # Errors
    /// * [`FetcherError::NoDataForPeriod`] for `INFO-200`
    /// * [`FetcherError::Upstream`] for any other code except `INFO-000`
    /// * [`FetcherError::Transport`] (decode) if the body is not a JSON object
    pub fn check_result(body: &Value, service: EcosService) -> FetcherResult<()> {
        if !body.is_object() {
            return Err(FetcherError::decode("response body is not a JSON object"));
        }

        let result = body
            .get("RESULT")
            .or_else(|| body.get(service.as_str()).and_then(|s| s.get("RESULT")));

        let Some(result) = result else {
            return Ok(());
        };

        let code = text_field(result, "CODE").unwrap_or_default();
        let message = text_field(result, "MESSAGE").unwrap_or_default();

        match code.as_str() {
            SUCCESS_CODE => Ok(()),
            NO_DATA_CODE => Err(FetcherError::NoDataForPeriod { code, message }),
            _ => Err(FetcherError::Upstream { code, message }),
        }
    }

    /// Parse a `StatisticSearch` response
    ///
    /// # Returns
    /// Rows in upstream order; total count from `list_total_count`
    ///
    /// # Errors
    /// Result-code errors from [`Self::check_result`], including
    /// `NoDataForPeriod`, and a decode error if the payload is missing
    pub fn parse_series(body: &Value) -> FetcherResult<SeriesResult> {
        let rows = Self::rows(body, EcosService::StatisticSearch)?;
        let Some((total_count, rows)) = rows else {
            return Ok(SeriesResult::empty());
        };

        let mut points = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(period) = text_field(row, "TIME") else {
                debug!("Skipping series row without TIME");
                continue;
            };
            points.push(SeriesPoint {
                period,
                value: text_field(row, "DATA_VALUE"),
                item_name: text_field(row, "ITEM_NAME1"),
                unit: text_field(row, "UNIT_NAME"),
            });
        }

        Ok(SeriesResult {
            total_count: total_count.max(points.len() as u64),
            points,
        })
    }

    /// Parse a `StatisticItemList` response
    ///
    /// Rows without an item code are skipped; an unknown cycle leaves the
    /// item's granularity unset.
    pub fn parse_item_list(body: &Value) -> FetcherResult<Vec<CatalogueItem>> {
        let rows = match Self::rows(body, EcosService::StatisticItemList) {
            Ok(Some((_, rows))) => rows,
            Ok(None) => return Ok(Vec::new()),
            Err(FetcherError::NoDataForPeriod { .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        Ok(rows
            .iter()
            .filter_map(|row| {
                let item_code = text_field(row, "ITEM_CODE")?;
                let item_name = text_field(row, "ITEM_NAME").unwrap_or_else(|| item_code.clone());
                let granularity = text_field(row, "CYCLE").and_then(|c| c.parse::<Granularity>().ok());
                Some(CatalogueItem {
                    item_code,
                    item_name,
                    granularity,
                })
            })
            .collect())
    }

    /// Parse a `StatisticTableList` response
    pub fn parse_table_list(body: &Value) -> FetcherResult<Vec<StatisticTable>> {
        let rows = match Self::rows(body, EcosService::StatisticTableList) {
            Ok(Some((_, rows))) => rows,
            Ok(None) => return Ok(Vec::new()),
            Err(FetcherError::NoDataForPeriod { .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        Ok(rows
            .iter()
            .filter_map(|row| {
                Some(StatisticTable {
                    series_code: text_field(row, "STAT_CODE")?,
                    name: text_field(row, "STAT_NAME").unwrap_or_default(),
                    granularity: text_field(row, "CYCLE").and_then(|c| c.parse().ok()),
                    organisation: text_field(row, "ORG_NAME"),
                })
            })
            .collect())
    }

    /// Payload rows of a service response, or `None` when it has zero rows
    fn rows(body: &Value, service: EcosService) -> FetcherResult<Option<(u64, &Vec<Value>)>> {
        Self::check_result(body, service)?;

        let payload = body.get(service.as_str()).ok_or_else(|| {
            FetcherError::decode(format!("response has neither RESULT nor {service}"))
        })?;

        let total_count = payload
            .get("list_total_count")
            .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())))
            .unwrap_or(0);

        match payload.get("row") {
            Some(Value::Array(rows)) if !rows.is_empty() => Ok(Some((total_count, rows))),
            Some(Value::Array(_)) | None => Ok(None),
            Some(_) => Err(FetcherError::decode(format!("{service}.row is not an array"))),
        }
    }
}

/// String field of a row; numbers are rendered, blanks and nulls are `None`
fn text_field(row: &Value, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
