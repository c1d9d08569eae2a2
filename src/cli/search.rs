//! Search command implementation

use crate::Gateway;
use clap::Args;
use std::io::Write;

use super::{CliError, ReportFormat};

/// Arguments for searching upstream series tables
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Substring of the series code (case-insensitive)
    #[arg(long)]
    pub code: Option<String>,

    /// Substring of the table name (case-insensitive)
    #[arg(long)]
    pub name: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "human")]
    pub format: ReportFormat,
}

impl SearchArgs {
    /// Execute the search command
    pub async fn execute(&self, gateway: &Gateway, out: &mut dyn Write) -> Result<(), CliError> {
        let tables = gateway
            .search_tables(self.code.as_deref(), self.name.as_deref())
            .await?;

        match self.format {
            ReportFormat::Json => {
                serde_json::to_writer_pretty(&mut *out, &tables)?;
                writeln!(out)?;
            }
            ReportFormat::Human => {
                writeln!(out, "Found {} tables:\n", tables.len())?;
                for table in &tables {
                    let cycle = table
                        .granularity
                        .map(|g| g.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    writeln!(
                        out,
                        "{:<10} [{}] {} {}",
                        table.series_code,
                        cycle,
                        table.name,
                        table.organisation.as_deref().unwrap_or_default()
                    )?;
                }
            }
        }
        Ok(())
    }
}
