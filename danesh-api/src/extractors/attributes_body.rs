//! JSON object body extractor.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use danesh_core::{attributes_from_value, Attributes};
use serde_json::Value;

use crate::error::ApiError;

/// Request body holding entity attributes. Anything but a JSON object is a
/// 400 with the standard error body.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributesBody(pub Attributes);

#[async_trait]
impl<S> FromRequest<S> for AttributesBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value): Json<Value> = Json::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::invalid_input(rejection.body_text()))?;
        Ok(Self(attributes_from_value(value)?))
    }
}
