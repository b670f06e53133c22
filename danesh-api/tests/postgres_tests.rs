//! Postgres backend tests. Run with `--features db-tests` against the
//! database named by the `DANESH_DB_*` variables.

#![cfg(feature = "db-tests")]

use std::sync::Arc;

use danesh_api::{ApiResult, DbConfig, PgBackend};
use danesh_core::{Actor, ManualClock};
use danesh_storage::{CacheCoherentStore, CacheConfig, TableCache};
use danesh_test_utils::assertions::{assert_constraint_violation, assert_not_found};
use danesh_test_utils::fixtures::{attrs, note_schema};
use serde_json::json;

fn test_store() -> ApiResult<CacheCoherentStore> {
    let backend = PgBackend::from_config(&DbConfig::from_env())?;
    let cache = TableCache::new(CacheConfig::new(), Arc::new(ManualClock::at_epoch_2024()));
    Ok(CacheCoherentStore::new(Arc::new(backend), Arc::new(cache)))
}

#[tokio::test]
async fn test_postgres_crud_chain() -> ApiResult<()> {
    let store = test_store()?;
    store.register(note_schema()).await?;
    let note = note_schema().entity_type().clone();
    let actor = Actor::new(1);
    let name = format!("pg-{}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default());

    let created = store
        .create(&note, Some(actor.id), attrs(json!({"name": name})))
        .await?;
    assert_eq!(store.get(&note, created.id).await?.id, created.id);

    let duplicate = store
        .create(&note, Some(actor.id), attrs(json!({"name": name})))
        .await;
    assert_constraint_violation(&duplicate);

    let updated = store
        .update(&note, created.id, attrs(json!({"body": "hello"})))
        .await?;
    assert_eq!(updated.str_attribute("body"), Some("hello"));
    assert_eq!(updated.str_attribute("name"), Some(name.as_str()));

    store.soft_delete(&note, created.id).await?;
    assert_not_found(&store.get(&note, created.id).await, "note");
    Ok(())
}
