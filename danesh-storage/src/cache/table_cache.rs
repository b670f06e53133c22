//! The table cache service.

use super::{CacheConfig, CacheRead, CacheStats};
use chrono::{DateTime, Utc};
use danesh_core::{Clock, DaneshResult, Entity, EntityType, Timestamp};
use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug)]
struct TableCacheEntry {
    rows: Arc<Vec<Entity>>,
    populated_at: Timestamp,
    expires_at: Timestamp,
    generation: u64,
}

impl TableCacheEntry {
    fn read(&self, was_cache_hit: bool) -> CacheRead {
        CacheRead::new(
            Arc::clone(&self.rows),
            self.generation,
            self.populated_at,
            was_cache_hit,
        )
    }
}

/// A slot holds at most one entry. Its mutex is the critical section for
/// check, populate and invalidate on that entity type.
type Slot = Arc<Mutex<Option<TableCacheEntry>>>;

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
    expirations: AtomicU64,
    live_entries: AtomicU64,
}

/// Process-wide cache of current rows, one entry per entity type.
///
/// Constructed once with its TTL and clock and shared by reference. Slots
/// for different entity types are independent, so work on one type never
/// waits for another.
pub struct TableCache {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    slots: DashMap<EntityType, Slot>,
    generation: AtomicU64,
    counters: Counters,
}

impl TableCache {
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            slots: DashMap::new(),
            generation: AtomicU64::new(0),
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The clock used for expiry, shared with callers that stamp rows.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn slot(&self, entity_type: &EntityType) -> Slot {
        Arc::clone(self.slots.entry(entity_type.clone()).or_default().value())
    }

    fn expiry(&self, from: Timestamp) -> Timestamp {
        chrono::Duration::from_std(self.config.entry_ttl)
            .ok()
            .and_then(|ttl| from.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Return the live entry for `entity_type`, or fill it with `populate`.
    ///
    /// The slot stays locked while `populate` runs, so an invalidation issued
    /// by a concurrent write waits and then discards what was populated. A
    /// failed population leaves the slot empty and returns the error.
    pub async fn read_through<F, Fut>(
        &self,
        entity_type: &EntityType,
        populate: F,
    ) -> DaneshResult<CacheRead>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DaneshResult<Vec<Entity>>>,
    {
        let slot = self.slot(entity_type);
        let mut entry = slot.lock().await;
        let now = self.clock.now();

        if let Some(current) = entry.as_ref() {
            if now < current.expires_at {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    entity_type = %entity_type,
                    generation = current.generation,
                    "table cache hit"
                );
                return Ok(current.read(true));
            }
            *entry = None;
            self.counters.expirations.fetch_add(1, Ordering::Relaxed);
            self.counters.live_entries.fetch_sub(1, Ordering::Relaxed);
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        let rows = populate().await?;

        let filled = TableCacheEntry {
            rows: Arc::new(rows),
            populated_at: now,
            expires_at: self.expiry(now),
            generation: self.generation.fetch_add(1, Ordering::Relaxed) + 1,
        };
        tracing::debug!(
            entity_type = %entity_type,
            generation = filled.generation,
            rows = filled.rows.len(),
            "table cache populated"
        );
        let read = filled.read(false);
        *entry = Some(filled);
        self.counters.live_entries.fetch_add(1, Ordering::Relaxed);
        Ok(read)
    }

    /// Drop the entry for `entity_type`. Returns whether one was present.
    pub async fn invalidate(&self, entity_type: &EntityType) -> bool {
        let Some(slot) = self.slots.get(entity_type).map(|s| Arc::clone(s.value())) else {
            return false;
        };
        let dropped = slot.lock().await.take();
        match dropped {
            Some(old) => {
                self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
                self.counters.live_entries.fetch_sub(1, Ordering::Relaxed);
                tracing::debug!(
                    entity_type = %entity_type,
                    generation = old.generation,
                    "table cache invalidated"
                );
                true
            }
            None => false,
        }
    }

    /// Generation of the entry currently held for `entity_type`, without
    /// counting as a read. Expired entries still report their generation.
    pub async fn generation_of(&self, entity_type: &EntityType) -> Option<u64> {
        let slot = self.slots.get(entity_type).map(|s| Arc::clone(s.value()))?;
        let entry = slot.lock().await;
        entry.as_ref().map(|e| e.generation)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            invalidations: self.counters.invalidations.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
            entry_count: self.counters.live_entries.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for TableCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableCache")
            .field("config", &self.config)
            .field("slots", &self.slots.len())
            .field("clock", &"<Clock>")
            .finish()
    }
}
