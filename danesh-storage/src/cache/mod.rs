//! Whole-table cache for current entity rows.
//!
//! One entry per entity type holds the complete ordered list of that type's
//! current rows. Entries are populated on a read miss, dropped by every write
//! to the type and expire after a fixed time-to-live.

mod read;
mod table_cache;

pub use read::CacheRead;
pub use table_cache::TableCache;

use serde::Serialize;
use std::time::Duration;

/// Default entry lifetime: one day.
pub const DEFAULT_ENTRY_TTL: Duration = Duration::from_secs(60 * 60 * 24);

/// Configuration for the table cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum age of an entry, independent of invalidation.
    pub entry_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            entry_ttl: DEFAULT_ENTRY_TTL,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entry TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.entry_ttl = ttl;
        self
    }
}

/// Counters describing cache behaviour since start-up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Reads served from a live entry.
    pub hits: u64,
    /// Reads that had to query storage.
    pub misses: u64,
    /// Entries dropped by writes.
    pub invalidations: u64,
    /// Entries dropped because they outlived the TTL.
    pub expirations: u64,
    /// Entries currently held.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
