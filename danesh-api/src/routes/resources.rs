//! REST API Routes for registered entity types
//!
//! - GET    /:entity_type       list current rows, filtered and paged
//! - POST   /:entity_type       create
//! - GET    /:entity_type/:id   fetch one current row
//! - PATCH  /:entity_type/:id   merge attributes
//! - DELETE /:entity_type/:id   soft-delete

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use danesh_core::{Entity, Filter};
use serde::{Deserialize, Serialize};

use crate::{
    config::ApiConfig,
    error::{ApiError, ApiResult},
    extractors::{AttributesBody, EntityPath},
    middleware::AuthExtractor,
    pagination::PageWindow,
    state::AppState,
};

/// Query keys that control paging rather than filtering.
const PAGING_KEYS: &[&str] = &["limit", "offset"];

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub items: Vec<Entity>,
    /// Matches before paging.
    pub total: usize,
}

/// Paging and filter parameters parsed from the query string.
#[derive(Debug, Clone, PartialEq)]
pub struct ListParams {
    pub filter: Filter,
    pub limit: usize,
    pub offset: usize,
}

impl ListParams {
    /// Parse `limit`, `offset` and `field__op=value` pairs.
    pub fn parse(pairs: &[(String, String)], config: &ApiConfig) -> ApiResult<Self> {
        let number = |key: &str| -> ApiResult<Option<usize>> {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| {
                    v.parse::<usize>()
                        .map_err(|_| ApiError::invalid_format(key, "a non-negative integer"))
                })
                .transpose()
        };

        let limit = number("limit")?
            .unwrap_or(config.default_page_size)
            .min(config.max_page_size);
        let offset = number("offset")?.unwrap_or(0);

        let filter = Filter::from_query_pairs(
            pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            PAGING_KEYS,
        )
        .map_err(|key| ApiError::invalid_format(&key, "field or field__<operator>"))?;

        Ok(Self {
            filter,
            limit,
            offset,
        })
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /api/v1/:entity_type
pub async fn list_entities(
    State(state): State<AppState>,
    Path(entity_type): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Json<ListResponse>> {
    let params = ListParams::parse(&pairs, &state.config)?;
    let mut matches = state.registry.list(&entity_type, &params.filter).await?;

    let total = matches.len();
    let window = PageWindow::offset(total, params.offset, params.limit, state.config.max_page_size);
    matches.truncate(window.end);
    let items = matches.split_off(window.start);

    Ok(Json(ListResponse { items, total }))
}

/// POST /api/v1/:entity_type
pub async fn create_entity(
    State(state): State<AppState>,
    AuthExtractor(actor): AuthExtractor,
    Path(entity_type): Path<String>,
    AttributesBody(attributes): AttributesBody,
) -> ApiResult<(StatusCode, Json<Entity>)> {
    let entity = state.registry.create(&entity_type, attributes, &actor).await?;
    Ok((StatusCode::CREATED, Json(entity)))
}

/// GET /api/v1/:entity_type/:id
pub async fn get_entity(
    State(state): State<AppState>,
    path: EntityPath,
) -> ApiResult<Json<Entity>> {
    let entity = state.registry.get(&path.entity_type, path.id).await?;
    Ok(Json(entity))
}

/// PATCH /api/v1/:entity_type/:id
pub async fn update_entity(
    State(state): State<AppState>,
    AuthExtractor(actor): AuthExtractor,
    path: EntityPath,
    AttributesBody(attributes): AttributesBody,
) -> ApiResult<Json<Entity>> {
    let entity = state
        .registry
        .update(&path.entity_type, path.id, attributes, &actor)
        .await?;
    Ok(Json(entity))
}

/// DELETE /api/v1/:entity_type/:id
pub async fn delete_entity(
    State(state): State<AppState>,
    AuthExtractor(actor): AuthExtractor,
    path: EntityPath,
) -> ApiResult<StatusCode> {
    state
        .registry
        .delete(&path.entity_type, path.id, &actor)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/:entity_type", get(list_entities).post(create_entity))
        .route(
            "/:entity_type/:id",
            get(get_entity).patch(update_entity).delete(delete_entity),
        )
}
