//! Axum Middleware for Actor Resolution
//!
//! This module provides Axum middleware that:
//! - Resolves the calling actor through the configured [`ActorResolver`]
//! - Injects the [`Actor`] into request extensions
//! - Returns 401 for requests without a usable identity

use crate::auth::ActorResolver;
use crate::error::ApiError;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use danesh_core::Actor;
use std::sync::Arc;

// ============================================================================
// MIDDLEWARE STATE
// ============================================================================

/// Shared state for the actor middleware.
#[derive(Clone)]
pub struct ActorMiddlewareState {
    pub resolver: Arc<dyn ActorResolver>,
}

impl ActorMiddlewareState {
    pub fn new(resolver: Arc<dyn ActorResolver>) -> Self {
        Self { resolver }
    }
}

impl std::fmt::Debug for ActorMiddlewareState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorMiddlewareState").finish_non_exhaustive()
    }
}

// ============================================================================
// MIDDLEWARE FUNCTION
// ============================================================================

/// Resolve the actor and store it in request extensions.
///
/// ```ignore
/// use axum::{Router, middleware};
///
/// let app = Router::new()
///     .route("/api/v1/:entity_type", axum::routing::get(|| async { "OK" }))
///     .layer(middleware::from_fn_with_state(actor_state.clone(), actor_middleware));
/// ```
pub async fn actor_middleware(
    State(state): State<ActorMiddlewareState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthMiddlewareError> {
    let actor = state
        .resolver
        .resolve(request.headers())
        .map_err(AuthMiddlewareError)?;

    tracing::debug!(actor = actor.id, elevated = actor.elevated, "actor resolved");
    request.extensions_mut().insert(actor);

    Ok(next.run(request).await)
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Error wrapper for middleware that implements IntoResponse.
#[derive(Debug)]
pub struct AuthMiddlewareError(pub ApiError);

impl IntoResponse for AuthMiddlewareError {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

// ============================================================================
// TYPED EXTRACTOR
// ============================================================================

/// Typed extractor for the resolved actor.
///
/// `actor_middleware` must run before handlers using this extractor;
/// without it extraction fails with a 500.
#[derive(Debug, Clone)]
pub struct AuthExtractor(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for AuthExtractor
where
    S: Send + Sync,
{
    type Rejection = AuthMiddlewareError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .map(AuthExtractor)
            .ok_or_else(|| {
                AuthMiddlewareError(ApiError::internal_error(
                    "Actor not found in request extensions. \
                     Ensure actor_middleware is applied to this route.",
                ))
            })
    }
}

impl std::ops::Deref for AuthExtractor {
    type Target = Actor;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
