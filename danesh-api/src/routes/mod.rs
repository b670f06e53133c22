//! HTTP Routes Module
//!
//! Includes:
//! - REST resource routes under /api/v1/:entity_type (actor required)
//! - GraphQL endpoint at /graphql (actor required) and its playground
//! - Health check endpoints at /health/* (public)
//! - CORS support for browser-based clients

pub mod graphql;
pub mod health;
pub mod resources;

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, header::HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{ACTOR_ID_HEADER, ACTOR_ROLES_HEADER};
use crate::config::ApiConfig;
use crate::middleware::actor_middleware;
use crate::state::AppState;

pub use graphql::create_router as graphql_router;
pub use health::create_router as health_router;
pub use resources::create_router as resources_router;

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 1024 * 1024;

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
/// In production mode, only allows configured origins.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(ACTOR_ID_HEADER),
            HeaderName::from_static(ACTOR_ROLES_HEADER),
        ])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter(|o| !o.starts_with("*."))
            .filter_map(|o| o.parse().ok())
            .collect();
        let config = config.clone();
        if origins.len() == config.cors_origins.len() {
            cors.allow_origin(origins)
        } else {
            // Wildcard subdomains need a predicate.
            cors.allow_origin(tower_http::cors::AllowOrigin::predicate(
                move |origin: &HeaderValue, _| {
                    origin
                        .to_str()
                        .is_ok_and(|origin| config.is_origin_allowed(origin))
                },
            ))
        }
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the complete router.
///
/// - `/api/v1/*` and `POST /graphql` resolve the actor first and answer 401
///   without one
/// - `/health/*` and `/graphql/playground` are public
pub fn create_api_router(state: AppState) -> Router {
    let protected = Router::new()
        .nest("/api/v1", resources::create_router())
        .merge(graphql::create_router())
        .route_layer(from_fn_with_state(
            state.actor_state.clone(),
            actor_middleware,
        ));

    let cors = build_cors_layer(&state.config);

    Router::new()
        .merge(protected)
        .merge(graphql::playground_router())
        .nest("/health", health::create_router())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
