//! In-memory TTL cache for upstream responses
//!
//! Entries are immutable once written and expire `ttl` after creation. Expired
//! entries are treated as absent by [`ResponseCache::get`] and evicted on that
//! read; [`ResponseCache::purge_expired`] sweeps the rest eagerly. TTL is the
//! only eviction policy, the working set is a few hundred keys.

use dashmap::DashMap;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Which TTL class a cached response belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlClass {
    /// Series data queries
    Data,
    /// Item and table listings
    Catalogue,
}

/// A cached value with its creation time and lifetime
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            ttl,
        }
    }

    /// Whether the entry has outlived its TTL at `now`
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.ttl
    }

    /// Cached value
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Configured lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// Snapshot of cache occupancy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// All stored entries
    pub total: usize,
    /// Entries still within their TTL
    pub active: usize,
    /// Entries past their TTL but not yet evicted
    pub expired: usize,
}

/// Thread-safe TTL key/value store
///
/// Keys must be derived from resolved query parameters only, never from
/// credentials.
#[derive(Debug)]
pub struct ResponseCache<V = serde_json::Value> {
    entries: DashMap<String, CacheEntry<V>>,
}

impl<V: Clone> ResponseCache<V> {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Look up a live entry
    ///
    /// An expired entry is reported as absent and removed.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();

        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(_) => {}
            None => return None,
        }

        // Shard guard from the lookup is released before removal
        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired(now))
            .is_some()
        {
            debug!(key = %key, "Evicted expired cache entry");
        }
        None
    }

    /// Store a value, replacing any existing entry for the key
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.entries.insert(key.into(), CacheEntry::new(value, ttl));
    }

    /// Whether a live entry exists for the key, without evicting
    pub fn contains_live(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired(now))
            .unwrap_or(false)
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Count total, active and expired entries
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let total = self.entries.len();
        let expired = self
            .entries
            .iter()
            .filter(|entry| entry.is_expired(now))
            .count();

        CacheStats {
            total,
            active: total.saturating_sub(expired),
            expired,
        }
    }

    /// Evict every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "Purged expired cache entries");
        }
        removed
    }
}

impl<V: Clone> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
