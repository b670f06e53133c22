//! Property-Based Tests for Ownership Enforcement
//!
//! For any owned row and any actor, an update or delete succeeds exactly
//! when the actor owns the row or is elevated. A refused write leaves the
//! row unchanged and visible.

use danesh_api::services::{owner_or_elevated, ResourceConfig, ResourceService};
use danesh_core::{Actor, WriteAction};
use danesh_test_utils::assertions::assert_forbidden;
use danesh_test_utils::fixtures::{attrs, note_schema, MemoryFixture};
use danesh_test_utils::generators::{arb_actor, arb_actor_id};
use proptest::prelude::*;
use serde_json::json;
use tokio::runtime::Runtime;

fn test_runtime() -> Result<Runtime, TestCaseError> {
    Runtime::new().map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

async fn note_service(fixture: &MemoryFixture) -> ResourceService {
    ResourceService::register(
        fixture.store.clone(),
        ResourceConfig::new(note_schema(), owner_or_elevated()),
    )
    .await
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_update_allowed_iff_owner_or_elevated(owner in arb_actor_id(), actor in arb_actor()) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let fixture = MemoryFixture::with_default_ttl();
            let service = note_service(&fixture).await;
            let row = service
                .create(attrs(json!({"name": "n"})), &Actor::new(owner))
                .await
                .unwrap();

            let result = service
                .update(row.id, attrs(json!({"body": "edited"})), &actor)
                .await;
            let allowed = actor.id == owner || actor.is_elevated();
            if allowed {
                prop_assert!(result.is_ok());
            } else {
                assert_forbidden(&result, WriteAction::Update);
                let current = service.get(row.id).await.unwrap();
                prop_assert!(current.attribute("body").is_none());
            }
            Ok(())
        })?;
    }

    #[test]
    fn prop_delete_allowed_iff_owner_or_elevated(owner in arb_actor_id(), actor in arb_actor()) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let fixture = MemoryFixture::with_default_ttl();
            let service = note_service(&fixture).await;
            let row = service
                .create(attrs(json!({"name": "n"})), &Actor::new(owner))
                .await
                .unwrap();

            let result = service.delete(row.id, &actor).await;
            let allowed = actor.id == owner || actor.is_elevated();
            prop_assert_eq!(result.is_ok(), allowed);
            prop_assert_eq!(service.get(row.id).await.is_ok(), !allowed);
            Ok(())
        })?;
    }
}
