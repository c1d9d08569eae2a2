//! Item resolution
//!
//! Maps a category plus an optional item key and granularity onto the
//! upstream's (series code, item code, granularity) triple. Tables without
//! usable items at the requested granularity trigger one discovery call per
//! series per run; the listing itself goes through the cache and limiter.

use super::{Catalogue, CatalogueError, ItemSpec};
use crate::fetcher::SeriesSource;
use crate::{metrics, Granularity};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Caller's choice of category, item, granularity and series
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemSelection<'a> {
    /// Category key
    pub category: &'a str,
    /// Item key, alias or upstream code; the category default when absent
    pub item_key: Option<&'a str>,
    /// Requested granularity; the category default when absent
    pub granularity: Option<Granularity>,
    /// Alternate series override; the primary series when absent
    pub series_code: Option<&'a str>,
}

/// A fully resolved item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedItem {
    /// Category key
    pub category: String,
    /// Key the item was selected by (alias or table key)
    pub item_key: String,
    /// Display name
    pub item_name: String,
    /// Series (table) code
    pub series_code: String,
    /// Upstream item code
    pub item_code: String,
    /// Granularity to request
    pub granularity: Granularity,
    /// Fallback step in months when the series is publication-lagged
    pub lag_step_months: Option<u32>,
}

/// Items usable for one category, series and granularity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTable {
    /// Category key
    pub category: String,
    /// Series (table) code
    pub series_code: String,
    /// Granularity the table was filtered for
    pub granularity: Granularity,
    /// Usable items by key
    pub items: BTreeMap<String, ItemSpec>,
    /// True when no item matched the granularity and all items were kept
    pub relaxed: bool,
    aliases: BTreeMap<String, String>,
    default_item: Option<String>,
    lag_step_months: Option<u32>,
}

impl ResolvedTable {
    /// Keys of every usable item, in table order
    pub fn item_keys(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }

    /// Select one item from the table
    ///
    /// With no key, the declared default is used if it resolves here, and
    /// otherwise the first key in sorted order.
    ///
    /// # Errors
    /// [`CatalogueError::UnknownItem`] when an explicit key matches no alias,
    /// key or item code.
    pub fn select(&self, item_key: Option<&str>) -> Result<ResolvedItem, CatalogueError> {
        if let Some(key) = item_key {
            return self
                .lookup(key)
                .or_else(|| self.lookup(&key.to_ascii_uppercase()))
                .ok_or_else(|| CatalogueError::UnknownItem {
                    category: self.category.clone(),
                    item: key.to_string(),
                    available: self.available(),
                });
        }

        self.default_item
            .as_deref()
            .and_then(|default| self.lookup(default))
            .or_else(|| {
                self.items
                    .keys()
                    .next()
                    .and_then(|first| self.lookup(first))
            })
            .ok_or_else(|| CatalogueError::NoItems {
                category: self.category.clone(),
                series_code: self.series_code.clone(),
            })
    }

    fn lookup(&self, key: &str) -> Option<ResolvedItem> {
        if let Some(code) = self.aliases.get(key) {
            let name = self
                .items
                .values()
                .find(|item| &item.code == code)
                .map(|item| item.name.clone())
                .unwrap_or_else(|| key.to_string());
            return Some(self.build(key, &name, code));
        }

        if let Some(item) = self.items.get(key) {
            return Some(self.build(key, &item.name, &item.code));
        }

        self.items
            .iter()
            .find(|(_, item)| item.code == key)
            .map(|(item_key, item)| self.build(item_key, &item.name, &item.code))
    }

    fn build(&self, item_key: &str, item_name: &str, item_code: &str) -> ResolvedItem {
        ResolvedItem {
            category: self.category.clone(),
            item_key: item_key.to_string(),
            item_name: item_name.to_string(),
            series_code: self.series_code.clone(),
            item_code: item_code.to_string(),
            granularity: self.granularity,
            lag_step_months: self.lag_step_months,
        }
    }

    fn available(&self) -> Vec<String> {
        self.aliases
            .keys()
            .chain(self.items.keys())
            .cloned()
            .collect()
    }
}

impl Catalogue {
    /// Resolve the usable item table for a category
    ///
    /// # Arguments
    /// * `source` - Used for the discovery call when one is needed
    /// * `category` - Category key
    /// * `granularity` - Requested granularity; the category default when absent
    /// * `series_code` - Alternate series override
    ///
    /// # Errors
    /// Unknown category or series, a discovery failure with no static items,
    /// or [`CatalogueError::NoItems`] when the table is still empty
    pub async fn resolve_table(
        &self,
        source: &dyn SeriesSource,
        category: &str,
        granularity: Option<Granularity>,
        series_code: Option<&str>,
    ) -> Result<ResolvedTable, CatalogueError> {
        let mapping = self.category(category)?;
        let granularity = granularity.unwrap_or(mapping.default_granularity);

        let series_code = match series_code {
            Some(code) if !mapping.accepts_series(code) => {
                return Err(CatalogueError::UnknownSeries {
                    category: category.to_string(),
                    series_code: code.to_string(),
                });
            }
            Some(code) => code,
            None => mapping.series_code.as_str(),
        };

        let mut items = self.merged_items(mapping, series_code);
        let has_match = items.values().any(|item| item.matches(granularity));

        if !self.is_discovered(series_code) && !has_match {
            match source.list_items(series_code).await {
                Ok(listing) => {
                    metrics::record_discovery(series_code, true);
                    let total = self.merge_discovered(series_code, &listing);
                    info!(
                        category = %category,
                        series = %series_code,
                        listed = listing.len(),
                        total,
                        "Discovered catalogue items"
                    );
                    items = self.merged_items(mapping, series_code);
                }
                Err(e) => {
                    metrics::record_discovery(series_code, false);
                    warn!(
                        category = %category,
                        series = %series_code,
                        error = %e,
                        "Item discovery failed"
                    );
                    if items.is_empty() {
                        return Err(CatalogueError::Discovery {
                            series_code: series_code.to_string(),
                            source: e,
                        });
                    }
                }
            }
        }

        let matching: BTreeMap<String, ItemSpec> = items
            .iter()
            .filter(|(_, item)| item.matches(granularity))
            .map(|(key, item)| (key.clone(), item.clone()))
            .collect();

        let relaxed = matching.is_empty() && !items.is_empty();
        let items = if relaxed {
            warn!(
                category = %category,
                series = %series_code,
                granularity = %granularity,
                available = items.len(),
                "No items at requested granularity, using all items"
            );
            items
        } else {
            matching
        };

        if items.is_empty() {
            return Err(CatalogueError::NoItems {
                category: category.to_string(),
                series_code: series_code.to_string(),
            });
        }

        Ok(ResolvedTable {
            category: category.to_string(),
            series_code: series_code.to_string(),
            granularity,
            items,
            relaxed,
            aliases: mapping.aliases.clone(),
            default_item: mapping.default_item.clone(),
            lag_step_months: mapping.lag_step_months(granularity),
        })
    }

    /// Resolve one item
    ///
    /// # Errors
    /// Everything [`Catalogue::resolve_table`] returns, plus
    /// [`CatalogueError::UnknownItem`]
    pub async fn resolve(
        &self,
        source: &dyn SeriesSource,
        selection: &ItemSelection<'_>,
    ) -> Result<ResolvedItem, CatalogueError> {
        self.resolve_table(
            source,
            selection.category,
            selection.granularity,
            selection.series_code,
        )
        .await?
        .select(selection.item_key)
    }
}
