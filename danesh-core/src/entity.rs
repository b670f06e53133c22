//! Entity model shared by every resource type.

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Row identifier, assigned sequentially per entity type.
pub type EntityId = i64;

/// Identifier of the acting user.
pub type ActorId = i64;

/// Timestamp type used across the crate.
pub type Timestamp = DateTime<Utc>;

/// Free-form attribute bag of an entity.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

const MAX_TYPE_NAME_LEN: usize = 48;

static TYPE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("Invalid entity type regex"));

fn is_valid_type_name(name: &str) -> bool {
    name.len() <= MAX_TYPE_NAME_LEN && TYPE_NAME.is_match(name)
}

/// Name of one entity type, which is also the name of its table.
///
/// Names are lowercase identifiers so they can be embedded in SQL table
/// names without quoting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityType(String);

impl EntityType {
    /// Parse and validate a type name.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if is_valid_type_name(&name) {
            Ok(Self(name))
        } else {
            Err(ValidationError::UnknownEntityType { name })
        }
    }

    /// Build a type name from a literal known to be valid.
    pub fn from_static(name: &'static str) -> Self {
        debug_assert!(is_valid_type_name(name), "invalid entity type {name}");
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EntityType {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EntityType> for String {
    fn from(value: EntityType) -> Self {
        value.0
    }
}

/// A stored row of any entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub entity_type: EntityType,
    #[serde(rename = "created_time")]
    pub created_at: Timestamp,
    #[serde(rename = "updated_time")]
    pub updated_at: Timestamp,
    #[serde(rename = "delete_flag")]
    pub deleted: bool,
    pub owner: Option<ActorId>,
    pub attributes: Attributes,
}

impl Entity {
    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&serde_json::Value> {
        self.attributes.get(name)
    }

    /// Convenience accessor for string attributes.
    pub fn str_attribute(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(|v| v.as_str())
    }

    pub fn is_current(&self) -> bool {
        !self.deleted
    }

    pub fn is_owned_by(&self, actor: ActorId) -> bool {
        self.owner == Some(actor)
    }
}

/// A validated row waiting to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntity {
    pub owner: Option<ActorId>,
    pub attributes: Attributes,
    pub created_at: Timestamp,
}
