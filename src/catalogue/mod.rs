//! Indicator catalogue
//!
//! Two tiers: immutable static category tables embedded in the binary, and a
//! discovered overlay filled at runtime from the upstream's item listing.
//! The overlay only ever grows; merges are upserts keyed by item code, so
//! concurrent discoveries of the same series cannot corrupt it.

use crate::fetcher::FetcherError;
use crate::{CatalogueItem, Granularity};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

pub mod resolver;

pub use resolver::{ItemSelection, ResolvedItem, ResolvedTable};

/// Embedded category tables
const CATALOGUE_JSON: &str = include_str!("categories.json");

/// Embedded category tables, parsed once
static EMBEDDED: Lazy<Result<BTreeMap<String, CategoryMapping>, CatalogueError>> =
    Lazy::new(|| parse_categories(CATALOGUE_JSON));

/// Catalogue errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogueError {
    /// No category with this key
    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    /// Item key not found among the usable items
    #[error("unknown item '{item}' in category '{category}' (available: {})", available.join(", "))]
    UnknownItem {
        /// Category searched
        category: String,
        /// Requested item key
        item: String,
        /// Keys and aliases that would have resolved
        available: Vec<String>,
    },

    /// Series override is not one of the category's tables
    #[error("series '{series_code}' does not belong to category '{category}'")]
    UnknownSeries {
        /// Category searched
        category: String,
        /// Rejected series code
        series_code: String,
    },

    /// Table is empty even after discovery and granularity relaxation
    #[error("no items available for category '{category}' (series {series_code})")]
    NoItems {
        /// Category searched
        category: String,
        /// Series whose table is empty
        series_code: String,
    },

    /// Discovery failed and no static items exist to fall back on
    #[error("item discovery for series '{series_code}' failed: {source}")]
    Discovery {
        /// Series whose item listing failed
        series_code: String,
        /// Underlying fetch error
        #[source]
        source: FetcherError,
    },

    /// Embedded or supplied catalogue JSON is invalid
    #[error("catalogue parse error: {0}")]
    Parse(String),
}

/// One item of a category table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSpec {
    /// Upstream item code
    pub code: String,
    /// Display name
    pub name: String,
    /// Native granularities; empty means usable at any granularity
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub granularities: Vec<Granularity>,
}

impl ItemSpec {
    /// Whether the item can serve a request at `granularity`
    pub fn matches(&self, granularity: Granularity) -> bool {
        self.granularities.is_empty() || self.granularities.contains(&granularity)
    }
}

/// Static definition of a logical category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMapping {
    /// Category key, e.g. "exchange"
    pub key: String,
    /// Display name
    pub name: String,
    /// Primary series (table) code
    pub series_code: String,
    /// Other series codes callers may select
    #[serde(default)]
    pub alternate_series: Vec<String>,
    /// Granularity used when the caller gives none
    pub default_granularity: Granularity,
    /// Item key or alias used when the caller gives none
    #[serde(default)]
    pub default_item: Option<String>,
    /// Static items by key; empty for discovered categories
    #[serde(default)]
    pub items: BTreeMap<String, ItemSpec>,
    /// Caller aliases mapping to upstream item codes
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    /// Granularities whose latest periods are routinely unpublished
    #[serde(default)]
    pub lagged_granularities: Vec<Granularity>,
}

impl CategoryMapping {
    /// Whether `series_code` is this category's primary or an alternate table
    pub fn accepts_series(&self, series_code: &str) -> bool {
        self.series_code == series_code || self.alternate_series.iter().any(|s| s == series_code)
    }

    /// Whether items come only from discovery
    pub fn is_dynamic(&self) -> bool {
        self.items.is_empty()
    }

    /// Months to step back per fallback retry at `granularity`, if lagged
    pub fn lag_step_months(&self, granularity: Granularity) -> Option<u32> {
        if self.lagged_granularities.contains(&granularity) {
            granularity.lag_step_months()
        } else {
            None
        }
    }
}

/// Category metadata for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    /// Display name
    pub name: String,
    /// Primary series code
    pub series_code: String,
    /// Alternate series codes
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternate_series: Vec<String>,
    /// Default granularity
    pub default_granularity: Granularity,
    /// Default item key, if declared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_item: Option<String>,
    /// Static plus discovered item count for the primary series
    pub item_count: usize,
    /// Whether items come from discovery
    pub dynamic: bool,
    /// Granularities routed through the fallback driver
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lagged_granularities: Vec<Granularity>,
}

#[derive(Debug, Deserialize)]
struct RawCatalogue {
    #[allow(dead_code)]
    schema_version: String,
    #[allow(dead_code)]
    last_updated: String,
    categories: Vec<CategoryMapping>,
}

/// Static category tables plus the discovered overlay
#[derive(Debug)]
pub struct Catalogue {
    categories: BTreeMap<String, CategoryMapping>,
    /// Discovered items by series code, then item code
    discovered: DashMap<String, BTreeMap<String, ItemSpec>>,
}

impl Catalogue {
    /// Load the embedded category tables with an empty overlay
    pub fn embedded() -> Result<Self, CatalogueError> {
        EMBEDDED.as_ref().map_err(Clone::clone).map(|categories| Self {
            categories: categories.clone(),
            discovered: DashMap::new(),
        })
    }

    /// Parse category tables from JSON
    ///
    /// # Errors
    /// Returns [`CatalogueError::Parse`] for malformed JSON, duplicate keys,
    /// or a static default item that names neither an item nor an alias.
    pub fn from_json(json: &str) -> Result<Self, CatalogueError> {
        Ok(Self {
            categories: parse_categories(json)?,
            discovered: DashMap::new(),
        })
    }

    /// Look up a category
    pub fn category(&self, key: &str) -> Result<&CategoryMapping, CatalogueError> {
        self.categories
            .get(key)
            .ok_or_else(|| CatalogueError::UnknownCategory(key.to_string()))
    }

    /// All categories in key order
    pub fn categories(&self) -> impl Iterator<Item = &CategoryMapping> {
        self.categories.values()
    }

    /// Metadata for every category
    pub fn summaries(&self) -> BTreeMap<String, CategorySummary> {
        self.categories
            .values()
            .map(|category| {
                let summary = CategorySummary {
                    name: category.name.clone(),
                    series_code: category.series_code.clone(),
                    alternate_series: category.alternate_series.clone(),
                    default_granularity: category.default_granularity,
                    default_item: category.default_item.clone(),
                    item_count: self.merged_items(category, &category.series_code).len(),
                    dynamic: category.is_dynamic(),
                    lagged_granularities: category.lagged_granularities.clone(),
                };
                (category.key.clone(), summary)
            })
            .collect()
    }

    /// Static and discovered items usable for `series_code`
    ///
    /// Static items apply to the primary series only. Static keys win over
    /// discovered item codes.
    pub fn merged_items(
        &self,
        category: &CategoryMapping,
        series_code: &str,
    ) -> BTreeMap<String, ItemSpec> {
        let mut merged = self
            .discovered
            .get(series_code)
            .map(|table| table.value().clone())
            .unwrap_or_default();

        if series_code == category.series_code {
            for (key, item) in &category.items {
                merged.insert(key.clone(), item.clone());
            }
        }
        merged
    }

    /// Whether discovery has recorded items for `series_code`
    pub fn is_discovered(&self, series_code: &str) -> bool {
        self.discovered.contains_key(series_code)
    }

    /// Upsert discovered items for a series
    ///
    /// Items are keyed by item code. A repeated code keeps the latest name
    /// and accumulates granularities, so merging the same listing twice is a
    /// no-op. An empty listing records nothing, so the series stays
    /// undiscovered and the next resolution asks upstream again. Returns the
    /// number of items in the series table afterwards.
    pub fn merge_discovered(&self, series_code: &str, items: &[CatalogueItem]) -> usize {
        if items.is_empty() {
            return self.discovered.get(series_code).map_or(0, |table| table.len());
        }

        let mut table = self.discovered.entry(series_code.to_string()).or_default();

        for item in items {
            let entry = table
                .entry(item.item_code.clone())
                .or_insert_with(|| ItemSpec {
                    code: item.item_code.clone(),
                    name: item.item_name.clone(),
                    granularities: Vec::new(),
                });
            entry.name = item.item_name.clone();
            if let Some(granularity) = item.granularity {
                if !entry.granularities.contains(&granularity) {
                    entry.granularities.push(granularity);
                    entry.granularities.sort();
                }
            }
        }

        debug!(
            series = %series_code,
            merged = items.len(),
            total = table.len(),
            "Merged discovered items"
        );
        table.len()
    }
}

fn parse_categories(json: &str) -> Result<BTreeMap<String, CategoryMapping>, CatalogueError> {
    let raw: RawCatalogue = serde_json::from_str(json)
        .map_err(|e| CatalogueError::Parse(format!("Failed to parse catalogue: {e}")))?;

    let mut categories = BTreeMap::new();
    for category in raw.categories {
        if let Some(default) = &category.default_item {
            let known =
                category.items.contains_key(default) || category.aliases.contains_key(default);
            if !category.is_dynamic() && !known {
                return Err(CatalogueError::Parse(format!(
                    "category '{}' default item '{default}' is not defined",
                    category.key
                )));
            }
        }
        let key = category.key.clone();
        if categories.insert(key.clone(), category).is_some() {
            return Err(CatalogueError::Parse(format!("duplicate category '{key}'")));
        }
    }
    Ok(categories)
}
