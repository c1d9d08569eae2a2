//! Categories command implementation

use crate::{Gateway, Granularity};
use clap::Args;
use std::io::Write;

use super::{parse_granularity, CliError, ReportFormat};

/// Arguments for listing categories
#[derive(Args, Debug)]
pub struct CategoriesArgs {
    /// Describe this category's items instead of listing categories
    pub category: Option<String>,

    /// Granularity to list items for (with a category)
    #[arg(long, requires = "category", value_parser = parse_granularity)]
    pub granularity: Option<Granularity>,

    /// Output format
    #[arg(long, value_enum, default_value = "human")]
    pub format: ReportFormat,
}

impl CategoriesArgs {
    /// Execute the categories command
    ///
    /// Listing is offline. Describing a category without a static item table
    /// issues its discovery call.
    pub async fn execute(&self, gateway: &Gateway, out: &mut dyn Write) -> Result<(), CliError> {
        match &self.category {
            Some(category) => self.describe(gateway, category, out).await,
            None => self.list(gateway, out),
        }
    }

    fn list(&self, gateway: &Gateway, out: &mut dyn Write) -> Result<(), CliError> {
        let categories = gateway.list_categories();

        match self.format {
            ReportFormat::Json => {
                serde_json::to_writer_pretty(&mut *out, &categories)?;
                writeln!(out)?;
            }
            ReportFormat::Human => {
                writeln!(out, "{} categories:\n", categories.len())?;
                for (key, summary) in &categories {
                    let items = if summary.dynamic {
                        format!("{} discovered", summary.item_count)
                    } else {
                        format!("{} items", summary.item_count)
                    };
                    writeln!(
                        out,
                        "{:<30} {} [{}] {:<16} {}",
                        key, summary.series_code, summary.default_granularity, items, summary.name
                    )?;
                }
            }
        }
        Ok(())
    }

    async fn describe(
        &self,
        gateway: &Gateway,
        category: &str,
        out: &mut dyn Write,
    ) -> Result<(), CliError> {
        let description = gateway.describe_category(category, self.granularity).await?;

        match self.format {
            ReportFormat::Json => {
                serde_json::to_writer_pretty(&mut *out, &description)?;
                writeln!(out)?;
            }
            ReportFormat::Human => {
                writeln!(
                    out,
                    "{} ({}) series {} [{}]",
                    description.category,
                    description.summary.name,
                    description.summary.series_code,
                    description.granularity
                )?;
                if description.relaxed {
                    writeln!(out, "No items at {}, listing all items", description.granularity)?;
                }
                for (alias, code) in &description.aliases {
                    writeln!(out, "  alias {alias} -> {code}")?;
                }
                for (key, item) in &description.items {
                    writeln!(out, "  {:<24} {:<12} {}", key, item.code, item.name)?;
                }
            }
        }
        Ok(())
    }
}
