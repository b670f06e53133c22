//! Error Types for the danesh API
//!
//! This module defines error handling for the API layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//! - Conversions from store, Postgres and pool errors
//!
//! All errors are serialized as JSON with appropriate HTTP status codes.

use async_graphql::ErrorExtensions;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use danesh_core::{ConfigError, DaneshError, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code and represents
/// a category of error that can occur during API operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Authentication Errors (401, 403)
    // ========================================================================
    /// Request carries no usable identity
    Unauthorized,

    /// Actor is neither the owner nor elevated
    Forbidden,

    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// Attributes failed validation
    ValidationFailed,

    /// Request contains invalid input data
    InvalidInput,

    /// Required field is missing from request
    MissingField,

    /// Field format is incorrect
    InvalidFormat,

    /// Entity type is not registered
    UnknownEntityType,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// No current row with the requested id
    EntityNotFound,

    // ========================================================================
    // Conflict Errors (409)
    // ========================================================================
    /// Uniqueness or reference constraint failed
    ConstraintViolation,

    // ========================================================================
    // Server Errors (500, 503)
    // ========================================================================
    /// Internal server error
    InternalError,

    /// Backing store could not be reached or failed
    StorageUnavailable,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,

            ErrorCode::Forbidden => StatusCode::FORBIDDEN,

            ErrorCode::ValidationFailed
            | ErrorCode::InvalidInput
            | ErrorCode::MissingField
            | ErrorCode::InvalidFormat
            | ErrorCode::UnknownEntityType => StatusCode::BAD_REQUEST,

            ErrorCode::EntityNotFound => StatusCode::NOT_FOUND,

            ErrorCode::ConstraintViolation => StatusCode::CONFLICT,

            ErrorCode::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "Authentication required",
            ErrorCode::Forbidden => "Access forbidden",
            ErrorCode::ValidationFailed => "Request validation failed",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::MissingField => "Required field is missing",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::UnknownEntityType => "Unknown entity type",
            ErrorCode::EntityNotFound => "Entity not found",
            ErrorCode::ConstraintViolation => "Constraint violation",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::StorageUnavailable => "Storage temporarily unavailable",
        }
    }

    /// Wire name, as serialized in error bodies and GraphQL extensions.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::MissingField => "MISSING_FIELD",
            ErrorCode::InvalidFormat => "INVALID_FORMAT",
            ErrorCode::UnknownEntityType => "UNKNOWN_ENTITY_TYPE",
            ErrorCode::EntityNotFound => "ENTITY_NOT_FOUND",
            ErrorCode::ConstraintViolation => "CONSTRAINT_VIOLATION",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::StorageUnavailable => "STORAGE_UNAVAILABLE",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
///
/// Returned by every REST endpoint on failure and mirrored into GraphQL
/// error extensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (offending field, constraint name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create an InvalidFormat error.
    pub fn invalid_format(field: &str, expected: &str) -> Self {
        Self::new(
            ErrorCode::InvalidFormat,
            format!("Field '{}' has invalid format, expected {}", field, expected),
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::EntityNotFound, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageUnavailable, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

// ============================================================================
// GRAPHQL INTEGRATION
// ============================================================================

impl ErrorExtensions for ApiError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.message.clone()).extend_with(|_, e| {
            e.set("code", self.code.as_str());
            if let Some(details) = &self.details {
                if let Ok(value) = async_graphql::Value::from_json(details.clone()) {
                    e.set("details", value);
                }
            }
        })
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let message = err.to_string();
        match &err {
            ValidationError::RequiredFieldMissing { field } => {
                ApiError::new(ErrorCode::MissingField, message)
                    .with_details(json!({ "field": field }))
            }
            ValidationError::UnknownEntityType { name } => {
                ApiError::new(ErrorCode::UnknownEntityType, message)
                    .with_details(json!({ "entity_type": name }))
            }
            ValidationError::NotAnObject => ApiError::new(ErrorCode::InvalidInput, message),
            ValidationError::InvalidValue { field, .. }
            | ValidationError::UnknownField { field, .. } => {
                ApiError::new(ErrorCode::ValidationFailed, message)
                    .with_details(json!({ "field": field }))
            }
        }
    }
}

impl From<DaneshError> for ApiError {
    fn from(err: DaneshError) -> Self {
        match err {
            DaneshError::Validation(inner) => inner.into(),
            DaneshError::ConstraintViolation { ref constraint, .. } => {
                let constraint = constraint.clone();
                ApiError::new(ErrorCode::ConstraintViolation, err.to_string())
                    .with_details(json!({ "constraint": constraint }))
            }
            DaneshError::NotFound { ref entity_type, id } => {
                let entity_type = entity_type.to_string();
                ApiError::new(ErrorCode::EntityNotFound, err.to_string())
                    .with_details(json!({ "entity_type": entity_type, "id": id }))
            }
            DaneshError::Forbidden { .. } => ApiError::new(ErrorCode::Forbidden, err.to_string()),
            DaneshError::StorageUnavailable { .. } => {
                ApiError::new(ErrorCode::StorageUnavailable, err.to_string())
            }
            DaneshError::Config(_) => ApiError::internal_error(err.to_string()),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::internal_error(err.to_string())
    }
}

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use danesh_core::{EntityType, WriteAction};

    #[test]
    fn test_store_errors_map_to_status() {
        let post = EntityType::from_static("post");
        let cases = [
            (
                DaneshError::from(ValidationError::InvalidValue {
                    field: "post_title".into(),
                    reason: "too long".into(),
                }),
                StatusCode::BAD_REQUEST,
            ),
            (
                DaneshError::constraint("hashtag.title", "duplicate"),
                StatusCode::CONFLICT,
            ),
            (DaneshError::not_found(&post, 1), StatusCode::NOT_FOUND),
            (
                DaneshError::Forbidden {
                    entity_type: post.clone(),
                    action: WriteAction::Update,
                    actor: 2,
                },
                StatusCode::FORBIDDEN,
            ),
            (DaneshError::storage("down"), StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_details_carry_field() {
        let err = ApiError::from(ValidationError::RequiredFieldMissing {
            field: "name".into(),
        });
        assert_eq!(err.code, ErrorCode::MissingField);
        assert_eq!(err.details, Some(json!({"field": "name"})));
    }

    #[test]
    fn test_error_code_wire_names_match_serde() -> Result<(), serde_json::Error> {
        for code in [
            ErrorCode::Unauthorized,
            ErrorCode::UnknownEntityType,
            ErrorCode::ConstraintViolation,
            ErrorCode::StorageUnavailable,
        ] {
            assert_eq!(serde_json::to_value(code)?, json!(code.as_str()));
        }
        Ok(())
    }

    #[test]
    fn test_error_body_shape() -> Result<(), serde_json::Error> {
        let body = serde_json::to_value(ApiError::from_code(ErrorCode::EntityNotFound))?;
        assert_eq!(body["code"], "ENTITY_NOT_FOUND");
        assert_eq!(body["message"], "Entity not found");
        assert!(body.get("details").is_none());
        Ok(())
    }

    #[test]
    fn test_graphql_extensions_carry_code() {
        let err = ApiError::from(DaneshError::constraint("hashtag.title", "duplicate")).extend();
        let extensions = err.extensions.expect("extensions set");
        assert_eq!(
            extensions.get("code"),
            Some(&async_graphql::Value::from("CONSTRAINT_VIOLATION"))
        );
        assert!(extensions.get("details").is_some());
    }
}
