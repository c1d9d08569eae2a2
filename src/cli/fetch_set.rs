//! Fetch-set command implementation

use crate::gateway::{GatewayError, IndicatorRequest, IndicatorSeries};
use crate::stats::SummaryStats;
use crate::{Gateway, Granularity};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;

use super::fetch::{describe, format_summary};
use super::{parse_granularity, CliError, ReportFormat};

/// Arguments for fetching several items of one category
#[derive(Args, Debug)]
pub struct FetchSetArgs {
    /// Category key (see `categories`)
    pub category: String,

    /// Start date (YYYYMMDD)
    #[arg(long)]
    pub start: String,

    /// End date (YYYYMMDD)
    #[arg(long)]
    pub end: String,

    /// Comma-separated item keys; every usable item when omitted
    #[arg(long, value_delimiter = ',')]
    pub items: Vec<String>,

    /// Granularity: D, M, Q or A
    #[arg(long, value_parser = parse_granularity)]
    pub granularity: Option<Granularity>,

    /// Alternate series code of the category
    #[arg(long)]
    pub series: Option<String>,

    /// Include summary statistics per item
    #[arg(long, default_value_t = false)]
    pub summary: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "human")]
    pub format: ReportFormat,
}

/// JSON shape of one item's outcome
#[derive(Serialize)]
struct ItemReport<'a> {
    status: &'static str,
    #[serde(flatten)]
    series: Option<&'a IndicatorSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<SummaryStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl FetchSetArgs {
    /// Gateway request for these arguments
    pub fn to_request(&self) -> IndicatorRequest {
        let mut request = IndicatorRequest::new(&self.category, &self.start, &self.end);
        request.granularity = self.granularity;
        request.series = self.series.clone();
        request
    }

    /// Execute the fetch-set command
    pub async fn execute(&self, gateway: &Gateway, out: &mut dyn Write) -> Result<(), CliError> {
        let items: Vec<String> = self
            .items
            .iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();

        let progress = (self.format == ReportFormat::Human).then(|| spinner(&self.category));
        let results = gateway.fetch_indicator_set(&self.to_request(), &items).await;
        if let Some(progress) = progress {
            progress.finish_and_clear();
        }
        let results = results?;

        let summaries: BTreeMap<&str, SummaryStats> = if self.summary {
            results
                .iter()
                .filter_map(|(key, outcome)| {
                    let series = outcome.as_ref().ok()?;
                    gateway
                        .summarize(&series.result)
                        .ok()
                        .map(|stats| (key.as_str(), stats))
                })
                .collect()
        } else {
            BTreeMap::new()
        };

        match self.format {
            ReportFormat::Json => {
                let report: BTreeMap<&str, ItemReport<'_>> = results
                    .iter()
                    .map(|(key, outcome)| {
                        (key.as_str(), item_report(outcome, summaries.get(key.as_str())))
                    })
                    .collect();
                serde_json::to_writer_pretty(&mut *out, &report)?;
                writeln!(out)?;
            }
            ReportFormat::Human => {
                let failed = results.values().filter(|outcome| outcome.is_err()).count();
                writeln!(out, "{} item(s), {} failed", results.len(), failed)?;
                for (key, outcome) in &results {
                    match outcome {
                        Ok(series) => {
                            writeln!(out, "{} ({} point(s))", describe(series), series.result.len())?;
                            if let Some(summary) = summaries.get(key.as_str()) {
                                writeln!(out, "  {}", format_summary(summary))?;
                            }
                        }
                        Err(e) => writeln!(out, "{}/{}: error: {e}", self.category, key)?,
                    }
                }
            }
        }
        Ok(())
    }
}

fn item_report<'a>(
    outcome: &'a Result<IndicatorSeries, GatewayError>,
    summary: Option<&SummaryStats>,
) -> ItemReport<'a> {
    match outcome {
        Ok(series) => ItemReport {
            status: "ok",
            series: Some(series),
            summary: summary.cloned(),
            error_kind: None,
            error: None,
        },
        Err(e) => ItemReport {
            status: "error",
            series: None,
            summary: None,
            error_kind: Some(e.kind().to_string()),
            error: Some(e.to_string()),
        },
    }
}

fn spinner(category: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("Fetching {category} items"));
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
