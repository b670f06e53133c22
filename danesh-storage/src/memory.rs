//! In-memory storage backend.
//!
//! Keeps every table in process memory behind a single lock. It enforces the
//! same unique and reference constraints as the Postgres backend, which makes
//! it suitable for tests and single-process deployments. Outages can be
//! simulated with [`InMemoryBackend::set_available`].

use crate::backend::StorageBackend;
use async_trait::async_trait;
use danesh_core::{
    Attributes, DaneshError, DaneshResult, Entity, EntityId, EntitySchema, EntityType, NewEntity,
    Timestamp,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Table {
    last_id: EntityId,
    rows: BTreeMap<EntityId, Entity>,
}

/// Process-local backend.
#[derive(Debug)]
pub struct InMemoryBackend {
    tables: RwLock<HashMap<EntityType, Table>>,
    available: AtomicBool,
    queries: AtomicU64,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
            queries: AtomicU64::new(0),
        }
    }

    /// Toggle simulated availability. While unavailable every call fails with
    /// `StorageUnavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of `query_current` calls that reached the tables.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }

    /// Number of stored rows of a type, soft-deleted ones included.
    pub fn row_count(&self, entity_type: &EntityType) -> usize {
        self.read_tables()
            .ok()
            .and_then(|tables| tables.get(entity_type).map(|t| t.rows.len()))
            .unwrap_or(0)
    }

    /// Raw row lookup that ignores the soft-delete flag.
    pub fn raw_row(&self, entity_type: &EntityType, id: EntityId) -> Option<Entity> {
        self.read_tables()
            .ok()
            .and_then(|tables| tables.get(entity_type)?.rows.get(&id).cloned())
    }

    fn ensure_available(&self) -> DaneshResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DaneshError::storage("in-memory backend is offline"))
        }
    }

    fn read_tables(&self) -> DaneshResult<RwLockReadGuard<'_, HashMap<EntityType, Table>>> {
        self.tables
            .read()
            .map_err(|_| DaneshError::storage("table lock poisoned"))
    }

    fn write_tables(&self) -> DaneshResult<RwLockWriteGuard<'_, HashMap<EntityType, Table>>> {
        self.tables
            .write()
            .map_err(|_| DaneshError::storage("table lock poisoned"))
    }
}

fn unprepared(entity_type: &EntityType) -> DaneshError {
    DaneshError::storage(format!("table for {entity_type} is not prepared"))
}

/// Check references and unique fields of `attributes` for a row of `schema`.
/// `own_id` is excluded from uniqueness checks on update.
fn check_constraints(
    tables: &HashMap<EntityType, Table>,
    schema: &EntitySchema,
    attributes: &Attributes,
    own_id: Option<EntityId>,
) -> DaneshResult<()> {
    let entity_type = schema.entity_type();

    for (field, target) in schema.references() {
        let Some(id) = attributes.get(field).and_then(Value::as_i64) else {
            continue;
        };
        let exists = tables
            .get(target)
            .is_some_and(|table| table.rows.contains_key(&id));
        if !exists {
            return Err(DaneshError::constraint(
                format!("{entity_type}.{field}"),
                format!("{target} {id} does not exist"),
            ));
        }
    }

    let table = tables.get(entity_type).ok_or_else(|| unprepared(entity_type))?;
    for spec in schema.unique_fields() {
        let Some(value) = attributes.get(&spec.name).filter(|v| !v.is_null()) else {
            continue;
        };
        let taken = table
            .rows
            .values()
            .any(|row| Some(row.id) != own_id && row.attributes.get(&spec.name) == Some(value));
        if taken {
            return Err(DaneshError::constraint(
                format!("{entity_type}.{}", spec.name),
                format!("value {value} already exists"),
            ));
        }
    }

    Ok(())
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn prepare(&self, schema: &EntitySchema) -> DaneshResult<()> {
        self.ensure_available()?;
        self.write_tables()?
            .entry(schema.entity_type().clone())
            .or_default();
        Ok(())
    }

    async fn query_current(&self, entity_type: &EntityType) -> DaneshResult<Vec<Entity>> {
        self.ensure_available()?;
        let tables = self.read_tables()?;
        let table = tables.get(entity_type).ok_or_else(|| unprepared(entity_type))?;
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(table
            .rows
            .values()
            .rev()
            .filter(|row| row.is_current())
            .cloned()
            .collect())
    }

    async fn insert(&self, schema: &EntitySchema, row: NewEntity) -> DaneshResult<Entity> {
        self.ensure_available()?;
        let mut tables = self.write_tables()?;
        check_constraints(&tables, schema, &row.attributes, None)?;

        let entity_type = schema.entity_type();
        let table = tables
            .get_mut(entity_type)
            .ok_or_else(|| unprepared(entity_type))?;
        table.last_id += 1;
        let entity = Entity {
            id: table.last_id,
            entity_type: entity_type.clone(),
            created_at: row.created_at,
            updated_at: row.created_at,
            deleted: false,
            owner: row.owner,
            attributes: row.attributes,
        };
        table.rows.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn update_current(
        &self,
        schema: &EntitySchema,
        id: EntityId,
        patch: Attributes,
        updated_at: Timestamp,
    ) -> DaneshResult<Option<Entity>> {
        self.ensure_available()?;
        let mut tables = self.write_tables()?;
        let entity_type = schema.entity_type();

        let is_current = tables
            .get(entity_type)
            .ok_or_else(|| unprepared(entity_type))?
            .rows
            .get(&id)
            .is_some_and(Entity::is_current);
        if !is_current {
            return Ok(None);
        }
        check_constraints(&tables, schema, &patch, Some(id))?;

        let Some(row) = tables
            .get_mut(entity_type)
            .and_then(|table| table.rows.get_mut(&id))
        else {
            return Ok(None);
        };
        row.attributes.extend(patch);
        row.updated_at = updated_at;
        Ok(Some(row.clone()))
    }

    async fn soft_delete(
        &self,
        entity_type: &EntityType,
        id: EntityId,
        updated_at: Timestamp,
    ) -> DaneshResult<bool> {
        self.ensure_available()?;
        let mut tables = self.write_tables()?;
        let table = tables
            .get_mut(entity_type)
            .ok_or_else(|| unprepared(entity_type))?;
        match table.rows.get_mut(&id) {
            Some(row) if row.is_current() => {
                row.deleted = true;
                row.updated_at = updated_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ping(&self) -> DaneshResult<()> {
        self.ensure_available()?;
        self.read_tables().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use danesh_core::FieldSpec;
    use serde_json::json;

    fn hashtag_schema() -> EntitySchema {
        EntitySchema::new(EntityType::from_static("hashtag"))
            .field(FieldSpec::text("title", 50).required().unique())
    }

    fn comment_schema() -> EntitySchema {
        EntitySchema::new(EntityType::from_static("comment"))
            .field(FieldSpec::reference("comment_parent", EntityType::from_static("hashtag")))
    }

    fn row(attributes: serde_json::Value) -> NewEntity {
        NewEntity {
            owner: Some(1),
            attributes: match attributes {
                Value::Object(map) => map,
                _ => Attributes::new(),
            },
            created_at: Utc::now(),
        }
    }

    async fn backend() -> InMemoryBackend {
        let backend = InMemoryBackend::new();
        backend.prepare(&hashtag_schema()).await.unwrap();
        backend.prepare(&comment_schema()).await.unwrap();
        backend
    }

    #[tokio::test]
    async fn test_ids_are_sequential_and_listed_descending() {
        let backend = backend().await;
        let schema = hashtag_schema();
        for title in ["rust", "tokio", "axum"] {
            backend.insert(&schema, row(json!({"title": title}))).await.unwrap();
        }
        let rows = backend.query_current(schema.entity_type()).await.unwrap();
        let ids: Vec<_> = rows.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(backend.query_count(), 1);
    }

    #[tokio::test]
    async fn test_unique_field_includes_deleted_rows() {
        let backend = backend().await;
        let schema = hashtag_schema();
        let tag = backend.insert(&schema, row(json!({"title": "rust"}))).await.unwrap();
        assert!(backend
            .soft_delete(schema.entity_type(), tag.id, Utc::now())
            .await
            .unwrap());

        let err = backend
            .insert(&schema, row(json!({"title": "rust"})))
            .await
            .unwrap_err();
        assert!(matches!(err, DaneshError::ConstraintViolation { .. }));
    }

    #[tokio::test]
    async fn test_reference_must_exist() {
        let backend = backend().await;
        let err = backend
            .insert(&comment_schema(), row(json!({"comment_parent": 42})))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DaneshError::constraint("comment.comment_parent", "hashtag 42 does not exist")
        );
    }

    #[tokio::test]
    async fn test_update_and_delete_only_touch_current_rows() {
        let backend = backend().await;
        let schema = hashtag_schema();
        let tag = backend.insert(&schema, row(json!({"title": "rust"}))).await.unwrap();

        let mut patch = Attributes::new();
        patch.insert("title".into(), json!("rustlang"));
        let updated = backend
            .update_current(&schema, tag.id, patch.clone(), Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.str_attribute("title"), Some("rustlang"));

        assert!(backend
            .soft_delete(schema.entity_type(), tag.id, Utc::now())
            .await
            .unwrap());
        assert!(!backend
            .soft_delete(schema.entity_type(), tag.id, Utc::now())
            .await
            .unwrap());
        assert!(backend
            .update_current(&schema, tag.id, patch, Utc::now())
            .await
            .unwrap()
            .is_none());

        let raw = backend.raw_row(schema.entity_type(), tag.id).unwrap();
        assert!(raw.deleted);
        assert_eq!(backend.row_count(schema.entity_type()), 1);
    }

    #[tokio::test]
    async fn test_update_may_keep_its_own_unique_value() {
        let backend = backend().await;
        let schema = hashtag_schema();
        let tag = backend.insert(&schema, row(json!({"title": "rust"}))).await.unwrap();
        let mut patch = Attributes::new();
        patch.insert("title".into(), json!("rust"));
        assert!(backend
            .update_current(&schema, tag.id, patch, Utc::now())
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_offline_backend_reports_storage_unavailable() {
        let backend = backend().await;
        backend.set_available(false);
        let err = backend
            .query_current(&EntityType::from_static("hashtag"))
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert!(backend.ping().await.is_err());

        backend.set_available(true);
        assert!(backend.ping().await.is_ok());
    }
}
