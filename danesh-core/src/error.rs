//! Error types for danesh operations

use crate::{ActorId, EntityId, EntityType};
use thiserror::Error;

/// Attribute validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Unknown field for {entity_type}: {field}")]
    UnknownField {
        entity_type: EntityType,
        field: String,
    },

    #[error("Unknown entity type: {name}")]
    UnknownEntityType { name: String },

    #[error("Attributes must be a JSON object")]
    NotAnObject,
}

impl ValidationError {
    /// Name of the offending field, when the error concerns one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::RequiredFieldMissing { field }
            | Self::InvalidValue { field, .. }
            | Self::UnknownField { field, .. } => Some(field),
            Self::UnknownEntityType { .. } | Self::NotAnObject => None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Kind of write an actor attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteAction {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for WriteAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Master error type for store and service operations.
///
/// Every variant is discriminated so transports can map it to a status code
/// without inspecting messages.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DaneshError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Constraint violation on {constraint}: {reason}")]
    ConstraintViolation { constraint: String, reason: String },

    #[error("{entity_type} with id {id} not found")]
    NotFound { entity_type: EntityType, id: EntityId },

    #[error("Actor {actor} may not {action} {entity_type}")]
    Forbidden {
        entity_type: EntityType,
        action: WriteAction,
        actor: ActorId,
    },

    #[error("Storage unavailable: {reason}")]
    StorageUnavailable { reason: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl DaneshError {
    pub fn not_found(entity_type: &EntityType, id: EntityId) -> Self {
        Self::NotFound {
            entity_type: entity_type.clone(),
            id,
        }
    }

    pub fn storage(reason: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            reason: reason.into(),
        }
    }

    pub fn constraint(constraint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            constraint: constraint.into(),
            reason: reason.into(),
        }
    }

    /// Whether a caller may reasonably retry the same request later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type alias for danesh operations.
pub type DaneshResult<T> = Result<T, DaneshError>;
