//! Period labels and calendar arithmetic
//!
//! ECOS encodes a period differently per granularity: `YYYYMMDD` for daily,
//! `YYYYMM` for monthly, `YYYYQn` for quarterly and `YYYY` for annual series.
//! Caller-facing dates are always `YYYYMMDD` and are converted here.

use crate::Granularity;
use chrono::{Datelike, Months, NaiveDate};
use std::cmp::Ordering;

/// Errors raised while parsing dates or period labels
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeriodError {
    /// Caller date is not a valid `YYYYMMDD` calendar date
    #[error("invalid date '{0}': expected YYYYMMDD")]
    InvalidDate(String),

    /// Period label does not match the granularity's format
    #[error("invalid period label '{label}' for granularity {granularity}")]
    InvalidLabel {
        /// The rejected label
        label: String,
        /// Granularity the label was parsed against
        granularity: Granularity,
    },
}

/// Sort key of a period label: (year, month, day)
///
/// Monthly labels use day 0, quarterly labels use the first month of the
/// quarter, annual labels use month 0.
pub type PeriodKey = (i32, u32, u32);

/// Parse a strict `YYYYMMDD` date
///
/// # Errors
/// Returns [`PeriodError::InvalidDate`] for anything other than eight digits
/// forming a real calendar date.
pub fn parse_date(input: &str) -> Result<NaiveDate, PeriodError> {
    let trimmed = input.trim();
    if trimmed.len() != 8 || !is_digits(trimmed) {
        return Err(PeriodError::InvalidDate(input.to_string()));
    }

    NaiveDate::parse_from_str(trimmed, "%Y%m%d")
        .map_err(|_| PeriodError::InvalidDate(input.to_string()))
}

/// Format a date as `YYYYMMDD`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Quarter number (1-4) of a date
pub fn quarter_of(date: NaiveDate) -> u32 {
    date.month0() / 3 + 1
}

/// Format a date as the period label ECOS expects for `granularity`
pub fn format_for_granularity(date: NaiveDate, granularity: Granularity) -> String {
    match granularity {
        Granularity::Daily => format_date(date),
        Granularity::Monthly => date.format("%Y%m").to_string(),
        Granularity::Quarterly => format!("{:04}Q{}", date.year(), quarter_of(date)),
        Granularity::Annual => format!("{:04}", date.year()),
    }
}

/// First calendar day of the period containing `date`
pub fn period_start(date: NaiveDate, granularity: Granularity) -> NaiveDate {
    let (year, month, day) = match granularity {
        Granularity::Daily => return date,
        Granularity::Monthly => (date.year(), date.month(), 1),
        Granularity::Quarterly => (date.year(), (quarter_of(date) - 1) * 3 + 1, 1),
        Granularity::Annual => (date.year(), 1, 1),
    };
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(date)
}

/// Parse a period label back to the first day of the period it names
///
/// # Errors
/// Returns [`PeriodError::InvalidLabel`] if the label is not in the
/// granularity's format or names an impossible period.
pub fn parse_period_label(label: &str, granularity: Granularity) -> Result<NaiveDate, PeriodError> {
    let invalid = || PeriodError::InvalidLabel {
        label: label.to_string(),
        granularity,
    };

    let parsed = match granularity {
        Granularity::Daily => return parse_date(label).map_err(|_| invalid()),
        Granularity::Monthly => {
            if label.len() != 6 || !is_digits(label) {
                return Err(invalid());
            }
            let year = label[..4].parse::<i32>().map_err(|_| invalid())?;
            let month = label[4..].parse::<u32>().map_err(|_| invalid())?;
            NaiveDate::from_ymd_opt(year, month, 1)
        }
        Granularity::Quarterly => {
            let (year, quarter) = label.split_once('Q').ok_or_else(invalid)?;
            if year.len() != 4 || !is_digits(year) || quarter.len() != 1 {
                return Err(invalid());
            }
            let year = year.parse::<i32>().map_err(|_| invalid())?;
            match quarter.parse::<u32>() {
                Ok(q @ 1..=4) => NaiveDate::from_ymd_opt(year, (q - 1) * 3 + 1, 1),
                _ => None,
            }
        }
        Granularity::Annual => {
            if label.len() != 4 || !is_digits(label) {
                return Err(invalid());
            }
            let year = label.parse::<i32>().map_err(|_| invalid())?;
            NaiveDate::from_ymd_opt(year, 1, 1)
        }
    };

    parsed.ok_or_else(invalid)
}

/// Shift a date back by whole months, clamping to the end of shorter months
///
/// `2024-03-31` shifted back one month is `2024-02-29`. Returns `None` only
/// when the result would leave chrono's representable range.
pub fn shift_months_back(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_sub_months(Months::new(months))
}

/// Number of days between `start` and `end`
pub fn span_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// Inclusive number of periods of `granularity` touched by `[start, end]`
///
/// This is the row count the upstream can return for the span. Returns 0
/// when `end` precedes `start`.
pub fn periods_in_span(start: NaiveDate, end: NaiveDate, granularity: Granularity) -> u64 {
    if end < start {
        return 0;
    }

    let count = match granularity {
        Granularity::Daily => span_days(start, end) + 1,
        Granularity::Monthly => month_index(end) - month_index(start) + 1,
        Granularity::Quarterly => quarter_index(end) - quarter_index(start) + 1,
        Granularity::Annual => i64::from(end.year() - start.year()) + 1,
    };

    u64::try_from(count).unwrap_or(0)
}

/// Sort key for a period label of any supported granularity
///
/// Returns `None` for labels in none of the four formats.
pub fn period_sort_key(label: &str) -> Option<PeriodKey> {
    let label = label.trim();

    if let Some((year, quarter)) = label.split_once('Q') {
        if year.len() != 4 || !is_digits(year) || quarter.len() != 1 || !is_digits(quarter) {
            return None;
        }
        let quarter = quarter.parse::<u32>().ok()?;
        if !(1..=4).contains(&quarter) {
            return None;
        }
        return Some((year.parse().ok()?, (quarter - 1) * 3 + 1, 0));
    }

    if !is_digits(label) {
        return None;
    }

    match label.len() {
        8 => Some((
            label[..4].parse().ok()?,
            label[4..6].parse().ok()?,
            label[6..].parse().ok()?,
        )),
        6 => Some((label[..4].parse().ok()?, label[4..].parse().ok()?, 0)),
        4 => Some((label.parse().ok()?, 0, 0)),
        _ => None,
    }
}

/// Compare two period labels chronologically
///
/// Unparseable labels sort before parseable ones and are compared as strings
/// among themselves.
pub fn compare_period_labels(a: &str, b: &str) -> Ordering {
    match (period_sort_key(a), period_sort_key(b)) {
        (Some(ka), Some(kb)) => ka.cmp(&kb),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

fn quarter_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 4 + i64::from(date.month0() / 3)
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
