//! Cache-coherent, soft-deleting entity store.

use crate::backend::StorageBackend;
use crate::cache::{CacheRead, CacheStats, TableCache};
use danesh_core::{
    ActorId, Attributes, DaneshError, DaneshResult, Entity, EntityId, EntitySchema, EntityType,
    NewEntity, ValidationError, ValidationMode,
};
use dashmap::DashMap;
use std::sync::Arc;

/// Read-through, invalidate-on-write access to every registered entity type.
///
/// Reads are served from the [`TableCache`] entry of the type, or fill it
/// from the backend on a miss. Every successful write invalidates that entry
/// before returning. Soft-deleted rows are never returned.
pub struct CacheCoherentStore {
    backend: Arc<dyn StorageBackend>,
    cache: Arc<TableCache>,
    schemas: DashMap<EntityType, Arc<EntitySchema>>,
}

impl CacheCoherentStore {
    pub fn new(backend: Arc<dyn StorageBackend>, cache: Arc<TableCache>) -> Self {
        Self {
            backend,
            cache,
            schemas: DashMap::new(),
        }
    }

    /// Register an entity type and prepare its storage.
    pub async fn register(&self, schema: EntitySchema) -> DaneshResult<()> {
        self.backend.prepare(&schema).await?;
        tracing::info!(
            entity_type = %schema.entity_type(),
            fields = schema.fields().len(),
            backend = self.backend.name(),
            "entity type registered"
        );
        self.schemas
            .insert(schema.entity_type().clone(), Arc::new(schema));
        Ok(())
    }

    /// Schema of a registered type.
    pub fn schema(&self, entity_type: &EntityType) -> DaneshResult<Arc<EntitySchema>> {
        self.schemas
            .get(entity_type)
            .map(|s| Arc::clone(s.value()))
            .ok_or_else(|| {
                ValidationError::UnknownEntityType {
                    name: entity_type.to_string(),
                }
                .into()
            })
    }

    /// Registered types in name order.
    pub fn entity_types(&self) -> Vec<EntityType> {
        let mut types: Vec<_> = self.schemas.iter().map(|s| s.key().clone()).collect();
        types.sort();
        types
    }

    /// Current rows of a type, most recent first, with cache provenance.
    pub async fn read(&self, entity_type: &EntityType) -> DaneshResult<CacheRead> {
        self.schema(entity_type)?;
        let backend = &self.backend;
        self.cache
            .read_through(entity_type, || async move {
                let mut rows = backend.query_current(entity_type).await?;
                rows.retain(Entity::is_current);
                rows.sort_unstable_by(|a, b| b.id.cmp(&a.id));
                Ok(rows)
            })
            .await
            .inspect_err(|e| {
                tracing::error!(entity_type = %entity_type, error = %e, "table query failed");
            })
    }

    /// Current rows of a type, most recent first.
    pub async fn list(&self, entity_type: &EntityType) -> DaneshResult<Arc<Vec<Entity>>> {
        Ok(self.read(entity_type).await?.into_rows())
    }

    /// One current row, looked up through the cached list.
    pub async fn get(&self, entity_type: &EntityType, id: EntityId) -> DaneshResult<Entity> {
        let rows = self.list(entity_type).await?;
        rows.iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| DaneshError::not_found(entity_type, id))
    }

    /// Validate and insert a new row, then invalidate the type's entry.
    pub async fn create(
        &self,
        entity_type: &EntityType,
        owner: Option<ActorId>,
        attributes: Attributes,
    ) -> DaneshResult<Entity> {
        let schema = self.schema(entity_type)?;
        let attributes = schema.validate(&attributes, ValidationMode::Create)?;
        let row = NewEntity {
            owner,
            attributes,
            created_at: self.cache.clock().now(),
        };

        let result = self.backend.insert(&schema, row).await;
        self.finish_write(entity_type, &result).await;
        let entity = result?;
        tracing::debug!(entity_type = %entity_type, id = entity.id, "entity created");
        Ok(entity)
    }

    /// Merge attributes into a current row, then invalidate the type's entry.
    ///
    /// Fails with `NotFound` without touching the cache when no current row
    /// has that id.
    pub async fn update(
        &self,
        entity_type: &EntityType,
        id: EntityId,
        attributes: Attributes,
    ) -> DaneshResult<Entity> {
        let schema = self.schema(entity_type)?;
        let patch = schema.validate(&attributes, ValidationMode::Patch)?;
        let now = self.cache.clock().now();

        let result = self.backend.update_current(&schema, id, patch, now).await;
        match result {
            Ok(Some(entity)) => {
                self.cache.invalidate(entity_type).await;
                tracing::debug!(entity_type = %entity_type, id, "entity updated");
                Ok(entity)
            }
            Ok(None) => Err(DaneshError::not_found(entity_type, id)),
            Err(e) => {
                self.finish_write::<()>(entity_type, &Err(e.clone())).await;
                Err(e)
            }
        }
    }

    /// Flag a current row as deleted, then invalidate the type's entry.
    ///
    /// A second call for the same id fails with `NotFound`.
    pub async fn soft_delete(&self, entity_type: &EntityType, id: EntityId) -> DaneshResult<()> {
        self.schema(entity_type)?;
        let now = self.cache.clock().now();

        match self.backend.soft_delete(entity_type, id, now).await {
            Ok(true) => {
                self.cache.invalidate(entity_type).await;
                tracing::debug!(entity_type = %entity_type, id, "entity soft-deleted");
                Ok(())
            }
            Ok(false) => Err(DaneshError::not_found(entity_type, id)),
            Err(e) => {
                self.finish_write::<()>(entity_type, &Err(e.clone())).await;
                Err(e)
            }
        }
    }

    /// Invalidate after a write attempt. Successful writes always invalidate.
    /// A storage fault leaves the outcome unknown, so it invalidates as well;
    /// rejected writes changed nothing and leave the entry alone.
    async fn finish_write<T>(&self, entity_type: &EntityType, result: &DaneshResult<T>) {
        match result {
            Ok(_) => {
                self.cache.invalidate(entity_type).await;
            }
            Err(e) if e.is_transient() => {
                tracing::error!(entity_type = %entity_type, error = %e, "write failed");
                self.cache.invalidate(entity_type).await;
            }
            Err(_) => {}
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Generation of the cache entry currently held for a type.
    pub async fn cached_generation(&self, entity_type: &EntityType) -> Option<u64> {
        self.cache.generation_of(entity_type).await
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn ping(&self) -> DaneshResult<()> {
        self.backend.ping().await
    }
}

impl std::fmt::Debug for CacheCoherentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheCoherentStore")
            .field("backend", &self.backend.name())
            .field("cache", &self.cache)
            .field("entity_types", &self.schemas.len())
            .finish()
    }
}
