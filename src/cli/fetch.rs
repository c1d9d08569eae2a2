//! Fetch command implementation

use crate::gateway::{IndicatorRequest, IndicatorSeries};
use crate::output::csv::CsvSeriesWriter;
use crate::output::{OutputWriter, SeriesWriter};
use crate::stats::SummaryStats;
use crate::{Gateway, Granularity, RowWindow};
use clap::Args;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

use super::{parse_granularity, with_output, CliError, SeriesFormat};

/// Arguments for fetching one indicator
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Category key (see `categories`)
    pub category: String,

    /// Start date (YYYYMMDD)
    #[arg(long)]
    pub start: String,

    /// End date (YYYYMMDD)
    #[arg(long)]
    pub end: String,

    /// Item key, alias or upstream item code
    #[arg(long)]
    pub item: Option<String>,

    /// Granularity: D, M, Q or A
    #[arg(long, value_parser = parse_granularity)]
    pub granularity: Option<Granularity>,

    /// Alternate series code of the category
    #[arg(long)]
    pub series: Option<String>,

    /// First row of an explicit pagination window
    #[arg(long, requires = "end_index", value_parser = clap::value_parser!(u32).range(1..))]
    pub start_index: Option<u32>,

    /// Last row of an explicit pagination window (clamped to 1000)
    #[arg(long, requires = "start_index", value_parser = clap::value_parser!(u32).range(1..))]
    pub end_index: Option<u32>,

    /// Include summary statistics
    #[arg(long, default_value_t = false)]
    pub summary: bool,

    /// Measure change against the first point of the window instead of the previous one
    #[arg(long, default_value_t = false, requires = "summary")]
    pub over_window: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "human")]
    pub format: SeriesFormat,

    /// Write output to this file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// JSON shape of a fetched indicator
#[derive(Serialize)]
struct FetchReport<'a> {
    #[serde(flatten)]
    series: &'a IndicatorSeries,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<SummaryStats>,
}

impl FetchArgs {
    /// Gateway request for these arguments
    pub fn to_request(&self) -> IndicatorRequest {
        let mut request = IndicatorRequest::new(&self.category, &self.start, &self.end);
        request.item = self.item.clone();
        request.granularity = self.granularity;
        request.series = self.series.clone();
        if let (Some(start), Some(end)) = (self.start_index, self.end_index) {
            request.rows = Some(RowWindow::new(start, end));
        }
        request
    }

    /// Execute the fetch command
    pub async fn execute(&self, gateway: &Gateway, out: &mut dyn Write) -> Result<(), CliError> {
        let series = gateway.fetch_indicator(&self.to_request()).await?;
        let summary = self.summary.then(|| self.summarize(gateway, &series)).flatten();

        with_output(self.output.as_deref(), out, |out| match self.format {
            SeriesFormat::Json => {
                let report = FetchReport {
                    series: &series,
                    summary,
                };
                serde_json::to_writer_pretty(&mut *out, &report)?;
                writeln!(out)?;
                Ok(())
            }
            SeriesFormat::Csv => {
                let mut writer = CsvSeriesWriter::from_writer(out);
                writer.write_points(&series.result.points)?;
                writer.close()?;
                Ok(())
            }
            SeriesFormat::Human => write_human(out, &series, summary.as_ref()),
        })
    }

    fn summarize(&self, gateway: &Gateway, series: &IndicatorSeries) -> Option<SummaryStats> {
        let summary = if self.over_window {
            gateway.summarize_over_window(&series.result)
        } else {
            gateway.summarize(&series.result)
        };
        match summary {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!(category = %series.category, item = %series.item_key, error = %e, "No summary");
                None
            }
        }
    }
}

/// One-line description of a fetched series
pub(crate) fn describe(series: &IndicatorSeries) -> String {
    let mut line = format!(
        "{}/{}: {} ({}/{} [{}]) {}..{}",
        series.category,
        series.item_key,
        series.item_name,
        series.series_code,
        series.item_code,
        series.granularity,
        series.start,
        series.effective_end
    );
    if series.fallback_steps > 0 {
        line.push_str(&format!(
            " (requested end {}, {} fallback step(s))",
            series.requested_end, series.fallback_steps
        ));
    }
    line
}

/// Human-readable summary line
pub(crate) fn format_summary(summary: &SummaryStats) -> String {
    format!(
        "current={} previous={} change={} ({}%) high={} low={} average={} n={}",
        summary.current,
        summary.previous,
        summary.change,
        summary.change_percent,
        summary.high,
        summary.low,
        summary.average,
        summary.observations
    )
}

fn write_human(
    out: &mut dyn Write,
    series: &IndicatorSeries,
    summary: Option<&SummaryStats>,
) -> Result<(), CliError> {
    writeln!(out, "{}", describe(series))?;

    if series.result.is_empty() {
        writeln!(out, "No data for the requested window")?;
    } else {
        writeln!(out, "{} point(s):", series.result.len())?;
        for point in &series.result.points {
            writeln!(
                out,
                "  {:<10} {:>16} {}",
                point.period,
                point.value.as_deref().unwrap_or("-"),
                point.unit.as_deref().unwrap_or_default()
            )?;
        }
    }

    if let Some(summary) = summary {
        writeln!(out, "Summary: {}", format_summary(summary))?;
    }
    Ok(())
}
