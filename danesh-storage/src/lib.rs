//! danesh storage
//!
//! The cache-coherent entity store and the backends it runs on:
//!
//! - [`StorageBackend`]: row persistence seam
//! - [`InMemoryBackend`]: process-local backend used by tests and demos
//! - [`TableCache`]: whole-table cache service with TTL and injected clock
//! - [`CacheCoherentStore`]: read-through, invalidate-on-write store

pub mod backend;
pub mod cache;
pub mod memory;
pub mod store;

pub use backend::StorageBackend;
pub use cache::{CacheConfig, CacheRead, CacheStats, TableCache, DEFAULT_ENTRY_TTL};
pub use memory::InMemoryBackend;
pub use store::CacheCoherentStore;
