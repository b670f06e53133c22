//! danesh API - REST and GraphQL layer
//!
//! Serves every registered entity type over `/api/v1/:entity_type` and a
//! relay-style GraphQL schema at `/graphql`. Reads go through the
//! cache-coherent store from `danesh-storage`; writes are checked against
//! each type's ownership rule first.

pub mod auth;
pub mod components;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod macros;
pub mod middleware;
pub mod pagination;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;

use std::sync::Arc;

use danesh_core::SystemClock;
use danesh_storage::{CacheCoherentStore, CacheConfig, StorageBackend, TableCache};

pub use auth::{ActorResolver, HeaderActorResolver, ACTOR_ID_HEADER, ACTOR_ROLES_HEADER};
pub use config::{ApiConfig, LogFormat, StorageKind};
pub use db::{DbConfig, PgBackend};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{actor_middleware, ActorMiddlewareState, AuthExtractor};
pub use routes::create_api_router;
pub use services::{ProfileStrengthService, ResourceConfig, ResourceRegistry, ResourceService};
pub use state::AppState;

/// Wire the table cache, the store and every catalog type onto `backend`.
///
/// Registration runs the backend's `prepare` for each type, so Postgres
/// tables exist before the first request.
pub async fn build_state(
    config: ApiConfig,
    backend: Arc<dyn StorageBackend>,
) -> ApiResult<AppState> {
    let cache = Arc::new(TableCache::new(
        CacheConfig::new().with_ttl(config.cache_ttl),
        Arc::new(SystemClock),
    ));
    let store = Arc::new(CacheCoherentStore::new(backend, cache));
    let registry = ResourceRegistry::with_catalog(store).await?;

    let resolver = Arc::new(HeaderActorResolver::new(config.elevated_roles.clone()));
    Ok(AppState::new(Arc::new(registry), config, resolver))
}
