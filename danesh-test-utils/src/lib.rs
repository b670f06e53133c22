//! danesh Test Utilities
//!
//! Shared test infrastructure for the danesh workspace:
//! - Fixtures that wire an in-memory store to a manual clock
//! - Proptest generators for attributes, actors and operation sequences
//! - Assertions over `DaneshResult`

pub use danesh_core::{
    Actor, ActorId, Attributes, Clock, DaneshError, DaneshResult, Entity, EntityId,
    EntitySchema, EntityType, FieldSpec, ManualClock, Timestamp, ValidationError, WriteAction,
};
pub use danesh_storage::{CacheCoherentStore, CacheConfig, InMemoryBackend, TableCache};

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-wired stores and common values.

    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    /// A store over a fresh in-memory backend, together with handles to
    /// the backend (for outage and query-count checks) and the clock
    /// (for expiring cache entries).
    pub struct MemoryFixture {
        pub store: Arc<CacheCoherentStore>,
        pub backend: Arc<InMemoryBackend>,
        pub clock: ManualClock,
    }

    impl MemoryFixture {
        pub fn new(ttl: Duration) -> Self {
            let clock = ManualClock::at_epoch_2024();
            let backend = Arc::new(InMemoryBackend::new());
            let cache = Arc::new(TableCache::new(
                CacheConfig::new().with_ttl(ttl),
                Arc::new(clock.clone()),
            ));
            let store = Arc::new(CacheCoherentStore::new(backend.clone(), cache));
            Self {
                store,
                backend,
                clock,
            }
        }

        /// One-day TTL, matching the server default.
        pub fn with_default_ttl() -> Self {
            Self::new(danesh_storage::DEFAULT_ENTRY_TTL)
        }
    }

    /// Build an attribute map from a `json!({...})` object literal.
    ///
    /// Panics if `value` is not an object.
    pub fn attrs(value: serde_json::Value) -> Attributes {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("attrs() expects a JSON object, got {other}"),
        }
    }

    pub fn owner(id: ActorId) -> Actor {
        Actor::new(id)
    }

    pub fn admin(id: ActorId) -> Actor {
        Actor::elevated(id)
    }

    /// A small schema with a unique `name` and a free-form `body`.
    pub fn note_schema() -> EntitySchema {
        EntitySchema::new(EntityType::from_static("note"))
            .field(FieldSpec::text("name", 100).required().unique())
            .field(FieldSpec::long_text("body"))
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for danesh values.

    use super::*;
    use proptest::prelude::*;
    use serde_json::Value;

    /// Positive actor ids in a small range so ownership collisions happen.
    pub fn arb_actor_id() -> impl Strategy<Value = ActorId> {
        1i64..=8
    }

    pub fn arb_actor() -> impl Strategy<Value = Actor> {
        (arb_actor_id(), any::<bool>()).prop_map(|(id, elevated)| {
            if elevated {
                Actor::elevated(id)
            } else {
                Actor::new(id)
            }
        })
    }

    /// Attributes accepted by [`crate::fixtures::note_schema`].
    pub fn arb_note_attributes() -> impl Strategy<Value = Attributes> {
        ("[a-z]{1,12}", "[a-z ]{0,40}").prop_map(|(name, body)| {
            let mut map = Attributes::new();
            map.insert("name".to_string(), Value::String(name));
            map.insert("body".to_string(), Value::String(body));
            map
        })
    }

    /// One step in a randomized store workload.
    #[derive(Debug, Clone)]
    pub enum StoreOp {
        Create(Attributes),
        /// Update the n-th created row, modulo the created count. The row may
        /// already be deleted.
        Update(usize, Attributes),
        /// Delete the n-th created row, modulo the created count.
        Delete(usize),
        List,
        /// Move the store's clock forward.
        AdvanceSecs(u64),
    }

    pub fn arb_store_op() -> impl Strategy<Value = StoreOp> {
        prop_oneof![
            3 => arb_note_attributes().prop_map(StoreOp::Create),
            2 => (any::<usize>(), arb_note_attributes())
                .prop_map(|(i, attrs)| StoreOp::Update(i, attrs)),
            1 => any::<usize>().prop_map(StoreOp::Delete),
            3 => Just(StoreOp::List),
            1 => (0u64..200_000).prop_map(StoreOp::AdvanceSecs),
        ]
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertion helpers over `DaneshResult`.

    use super::*;

    pub fn assert_not_found<T: std::fmt::Debug>(result: &DaneshResult<T>, entity_type: &str) {
        match result {
            Err(DaneshError::NotFound { entity_type: et, .. }) => {
                assert_eq!(et.as_str(), entity_type, "Wrong entity type in NotFound error");
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    pub fn assert_forbidden<T: std::fmt::Debug>(result: &DaneshResult<T>, action: WriteAction) {
        match result {
            Err(DaneshError::Forbidden { action: a, .. }) => {
                assert_eq!(*a, action, "Wrong action in Forbidden error");
            }
            other => panic!("Expected Forbidden, got {:?}", other),
        }
    }

    pub fn assert_constraint_violation<T: std::fmt::Debug>(result: &DaneshResult<T>) {
        assert!(
            matches!(result, Err(DaneshError::ConstraintViolation { .. })),
            "Expected ConstraintViolation, got {:?}",
            result
        );
    }

    pub fn assert_validation_error<T: std::fmt::Debug>(result: &DaneshResult<T>) {
        assert!(
            matches!(result, Err(DaneshError::Validation(_))),
            "Expected Validation error, got {:?}",
            result
        );
    }

    pub fn assert_storage_unavailable<T: std::fmt::Debug>(result: &DaneshResult<T>) {
        assert!(
            matches!(result, Err(DaneshError::StorageUnavailable { .. })),
            "Expected StorageUnavailable, got {:?}",
            result
        );
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::generators::*;
    use danesh_core::ValidationMode;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_attrs_helper() {
        let map = attrs(json!({"name": "a", "n": 1}));
        assert_eq!(map.len(), 2);
    }

    #[test]
    #[should_panic(expected = "expects a JSON object")]
    fn test_attrs_rejects_non_object() {
        attrs(json!([1, 2]));
    }

    #[test]
    fn test_admin_is_elevated() {
        assert!(admin(1).is_elevated());
        assert!(!owner(1).is_elevated());
    }

    proptest! {
        #[test]
        fn prop_note_attributes_fit_schema(attributes in arb_note_attributes()) {
            let validated = note_schema().validate(&attributes, ValidationMode::Create);
            prop_assert!(validated.is_ok());
        }
    }
}
