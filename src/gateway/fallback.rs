//! Publication-lag fallback
//!
//! Lag-prone series often have no value yet for the latest period even
//! though the request is valid. The driver walks the end date back one step
//! at a time until rows appear, a hard error occurs, the window would become
//! empty, or the retry budget runs out.

use crate::fetcher::{FetcherResult, SeriesSource};
use crate::gateway::config::DEFAULT_FALLBACK_MAX_RETRIES;
use crate::period::shift_months_back;
use crate::{metrics, Granularity, SeriesQuery, SeriesResult};
use chrono::NaiveDate;
use tracing::{debug, info};

/// Step size and retry budget for one lagged series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackPolicy {
    /// Months to move the end date back per retry
    pub step_months: u32,
    /// Retries after the initial attempt
    pub max_retries: u32,
}

impl FallbackPolicy {
    /// Default policy for a granularity, if it lags
    ///
    /// Quarterly steps 3 months and monthly steps 1 month. Daily and annual
    /// series are not retried.
    pub fn for_granularity(granularity: Granularity) -> Option<Self> {
        granularity.lag_step_months().map(|step_months| Self {
            step_months,
            max_retries: DEFAULT_FALLBACK_MAX_RETRIES,
        })
    }

    /// Same step with a different retry budget
    pub fn with_max_retries(self, max_retries: u32) -> Self {
        Self {
            max_retries,
            ..self
        }
    }
}

/// Final result of a fallback run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackOutcome {
    /// Rows from the last attempt
    pub result: SeriesResult,
    /// End date of the last attempt
    pub effective_end: NaiveDate,
    /// Number of end-date shifts performed
    pub steps: u32,
}

/// Whether an attempt's outcome calls for an earlier window
///
/// True for the "no data" variant and for an empty result. Every other
/// error is final.
pub fn needs_earlier_window(outcome: &FetcherResult<SeriesResult>) -> bool {
    match outcome {
        Ok(result) => result.is_empty(),
        Err(err) => err.is_no_data(),
    }
}

/// Fetch `query`, shifting its end date back while the upstream has no data
///
/// # Arguments
/// * `source` - Series source used for every attempt
/// * `query` - Initial query
/// * `policy` - Step size and retry budget
///
/// # Returns
/// The first non-empty result, or an empty result for the last window tried
/// when the budget or the window runs out
///
/// # Errors
/// The first error other than [`crate::fetcher::FetcherError::NoDataForPeriod`]
pub async fn fetch_with_fallback(
    source: &dyn SeriesSource,
    query: &SeriesQuery,
    policy: &FallbackPolicy,
) -> FetcherResult<FallbackOutcome> {
    let mut current = query.clone();
    let mut steps = 0;

    loop {
        let outcome = source.fetch_series(&current).await;

        if !needs_earlier_window(&outcome) {
            if steps > 0 {
                info!(
                    query = %query,
                    effective_end = %current.end,
                    steps,
                    "Fallback found data in an earlier window"
                );
            }
            return outcome.map(|result| FallbackOutcome {
                result,
                effective_end: current.end,
                steps,
            });
        }

        if steps >= policy.max_retries {
            info!(query = %query, steps, "Fallback retry budget exhausted");
            return Ok(exhausted(outcome, current.end, steps));
        }

        let earlier = match shift_months_back(current.end, policy.step_months) {
            Some(end) if end >= current.start => end,
            _ => {
                debug!(query = %query, steps, "Fallback window exhausted");
                return Ok(exhausted(outcome, current.end, steps));
            }
        };

        steps += 1;
        metrics::record_fallback_step(&query.series_code, steps);
        debug!(
            series = %query.series_code,
            item = %query.item_code,
            from = %current.end,
            to = %earlier,
            step = steps,
            "No data yet, moving end date back"
        );
        current = current.with_end(earlier);
    }
}

/// Only called for outcomes [`needs_earlier_window`] accepted, so an error
/// here is always "no data"
fn exhausted(
    outcome: FetcherResult<SeriesResult>,
    effective_end: NaiveDate,
    steps: u32,
) -> FallbackOutcome {
    FallbackOutcome {
        result: outcome.unwrap_or_default(),
        effective_end,
        steps,
    }
}
