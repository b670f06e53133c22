//! Storage backend trait.
//!
//! A backend persists rows for every registered entity type. It knows
//! nothing about caching; [`crate::CacheCoherentStore`] layers the cache
//! and invalidation on top.

use async_trait::async_trait;
use danesh_core::{
    Attributes, DaneshResult, Entity, EntityId, EntitySchema, EntityType, NewEntity, Timestamp,
};

/// Row persistence for entity types.
///
/// Every fault that is not a constraint violation must surface as
/// `DaneshError::StorageUnavailable`. Implementations never retry.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short name used in logs and health reports.
    fn name(&self) -> &'static str;

    /// Make storage ready for an entity type (tables, indexes). Idempotent.
    async fn prepare(&self, schema: &EntitySchema) -> DaneshResult<()>;

    /// All rows of the type whose soft-delete flag is false, ordered by
    /// descending id.
    async fn query_current(&self, entity_type: &EntityType) -> DaneshResult<Vec<Entity>>;

    /// Insert a new row with the next id. `created_at` is used for both
    /// timestamps and the soft-delete flag starts false.
    ///
    /// Unique fields and references declared by the schema are enforced and
    /// reported as `ConstraintViolation`.
    async fn insert(&self, schema: &EntitySchema, row: NewEntity) -> DaneshResult<Entity>;

    /// Merge `patch` into the attributes of a current row and set its update
    /// timestamp. Returns `None` when no current row has that id.
    async fn update_current(
        &self,
        schema: &EntitySchema,
        id: EntityId,
        patch: Attributes,
        updated_at: Timestamp,
    ) -> DaneshResult<Option<Entity>>;

    /// Set the soft-delete flag of a current row. Returns `false` when no
    /// current row has that id.
    async fn soft_delete(
        &self,
        entity_type: &EntityType,
        id: EntityId,
        updated_at: Timestamp,
    ) -> DaneshResult<bool>;

    /// Cheap liveness probe.
    async fn ping(&self) -> DaneshResult<()>;
}
