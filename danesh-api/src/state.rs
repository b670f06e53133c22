//! Shared application state for Axum routers.

use std::sync::Arc;

use crate::auth::ActorResolver;
use crate::config::ApiConfig;
use crate::middleware::ActorMiddlewareState;
use crate::routes::graphql::{create_schema, DaneshSchema};
use crate::services::ResourceRegistry;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Resource services for every registered entity type. Owns the store
    /// and through it the table cache.
    pub registry: Arc<ResourceRegistry>,
    pub config: Arc<ApiConfig>,
    pub graphql_schema: DaneshSchema,
    pub actor_state: ActorMiddlewareState,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        registry: Arc<ResourceRegistry>,
        config: ApiConfig,
        resolver: Arc<dyn ActorResolver>,
    ) -> Self {
        Self {
            graphql_schema: create_schema(Arc::clone(&registry)),
            registry,
            config: Arc::new(config),
            actor_state: ActorMiddlewareState::new(resolver),
            start_time: std::time::Instant::now(),
        }
    }
}

crate::impl_from_ref!(Arc<ResourceRegistry>, registry);
crate::impl_from_ref!(Arc<ApiConfig>, config);
crate::impl_from_ref!(DaneshSchema, graphql_schema);
crate::impl_from_ref!(ActorMiddlewareState, actor_state);
crate::impl_from_ref!(std::time::Instant, start_time);
