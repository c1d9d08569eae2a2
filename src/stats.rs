//! Summary statistics over a fetched series
//!
//! Blank, non-numeric and non-positive values are dropped before anything is
//! computed. Remaining points are ordered by period label, and every output
//! is rounded to two decimal places.

use crate::period::compare_period_labels;
use crate::SeriesResult;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Decimal places kept in every statistic
const DECIMAL_PLACES: u32 = 2;

/// Statistics errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatsError {
    /// No point had a positive numeric value
    #[error("series has no positive numeric values")]
    EmptySeries,
}

/// Reduced view of a series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Highest value
    pub high: Decimal,
    /// Lowest value
    pub low: Decimal,
    /// Arithmetic mean
    pub average: Decimal,
    /// Latest value
    pub current: Decimal,
    /// Reference value the change is measured against
    pub previous: Decimal,
    /// `current - previous`
    pub change: Decimal,
    /// `change / previous * 100`, zero when `previous` is zero
    pub change_percent: Decimal,
    /// Points that survived filtering
    pub observations: usize,
    /// Period label of `current`
    pub latest_period: String,
}

/// Summarize with `previous` taken as the second-to-last point
///
/// A single point is its own previous value.
///
/// # Errors
/// [`StatsError::EmptySeries`] when no point has a positive numeric value
pub fn summarize(result: &SeriesResult) -> Result<SummaryStats, StatsError> {
    reduce(result, |values| {
        values
            .len()
            .checked_sub(2)
            .map_or(values[values.len() - 1], |i| values[i])
    })
}

/// Summarize with `previous` taken as the first point of the window
///
/// # Errors
/// [`StatsError::EmptySeries`] when no point has a positive numeric value
pub fn summarize_over_window(result: &SeriesResult) -> Result<SummaryStats, StatsError> {
    reduce(result, |values| values[0])
}

fn reduce(
    result: &SeriesResult,
    previous_of: impl Fn(&[Decimal]) -> Decimal,
) -> Result<SummaryStats, StatsError> {
    let mut points: Vec<(&str, Decimal)> = result
        .points
        .iter()
        .filter_map(|point| {
            point
                .numeric_value()
                .filter(|value| value.is_sign_positive() && !value.is_zero())
                .map(|value| (point.period.as_str(), value))
        })
        .collect();
    points.sort_by(|a, b| compare_period_labels(a.0, b.0));

    let values: Vec<Decimal> = points.iter().map(|(_, value)| *value).collect();
    let (Some(&current), Some(&(latest_period, _))) = (values.last(), points.last()) else {
        return Err(StatsError::EmptySeries);
    };

    let high = values.iter().copied().fold(current, Decimal::max);
    let low = values.iter().copied().fold(current, Decimal::min);
    let sum: Decimal = values.iter().copied().sum();
    let average = sum / Decimal::from(values.len());

    let previous = previous_of(&values);
    let change = current - previous;
    let change_percent = if previous.is_zero() {
        Decimal::ZERO
    } else {
        change / previous * Decimal::ONE_HUNDRED
    };

    Ok(SummaryStats {
        high: round(high),
        low: round(low),
        average: round(average),
        current: round(current),
        previous: round(previous),
        change: round(change),
        change_percent: round(change_percent),
        observations: values.len(),
        latest_period: latest_period.to_string(),
    })
}

fn round(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}
