//! Result of a cache read.

use danesh_core::{Entity, Timestamp};
use std::sync::Arc;

/// Rows returned by [`super::TableCache::read_through`] with provenance.
///
/// Two reads that share a generation observed the same entry; a hit hands
/// out the very same `Arc` that was stored on population.
#[derive(Debug, Clone)]
pub struct CacheRead {
    rows: Arc<Vec<Entity>>,
    generation: u64,
    populated_at: Timestamp,
    was_cache_hit: bool,
}

impl CacheRead {
    pub(crate) fn new(
        rows: Arc<Vec<Entity>>,
        generation: u64,
        populated_at: Timestamp,
        was_cache_hit: bool,
    ) -> Self {
        Self {
            rows,
            generation,
            populated_at,
            was_cache_hit,
        }
    }

    pub fn rows(&self) -> &Arc<Vec<Entity>> {
        &self.rows
    }

    pub fn into_rows(self) -> Arc<Vec<Entity>> {
        self.rows
    }

    /// Identifier of the cache entry that served this read.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When the entry was filled from storage.
    pub fn populated_at(&self) -> Timestamp {
        self.populated_at
    }

    pub fn was_cache_hit(&self) -> bool {
        self.was_cache_hit
    }
}
