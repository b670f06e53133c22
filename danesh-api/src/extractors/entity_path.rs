//! Path extractor for `/:entity_type/:id` routes.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use danesh_core::EntityId;

use crate::error::ApiError;

/// Entity type name and row id taken from the path.
///
/// Unlike `Path<(String, i64)>`, a malformed id is rejected with the
/// standard JSON error body. Any integer is accepted; ids that name no row
/// are left for the store to report as not found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityPath {
    pub entity_type: String,
    pub id: EntityId,
}

#[async_trait]
impl<S> FromRequestParts<S> for EntityPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path((entity_type, raw_id)): Path<(String, String)> =
            Path::from_request_parts(parts, state)
                .await
                .map_err(|e| ApiError::invalid_input(format!("Invalid path: {e}")))?;

        let id = raw_id
            .parse::<EntityId>()
            .map_err(|_| ApiError::invalid_format("id", "an integer"))?;

        Ok(Self { entity_type, id })
    }
}
