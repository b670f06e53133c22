//! Per-type entity schemas and attribute validation.
//!
//! A schema is the small configuration struct each entity type supplies:
//! its field list, per-field constraints and optional whole-record rules.
//! The store validates every write against it before touching storage.

use crate::entity::{Attributes, EntityType};
use crate::error::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Maximum length accepted for URL fields.
pub const MAX_URL_LEN: usize = 200;

static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("Invalid URL regex"));

/// Value type and constraints of one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// UTF-8 string, optionally bounded in characters.
    Text { max_len: Option<usize> },
    Integer,
    Boolean,
    /// Absolute http(s) URL.
    Url,
    /// One of a fixed set of strings.
    Choice(Vec<String>),
    /// Identifier of a row of another (or the same) entity type.
    Reference(EntityType),
    /// Any JSON value.
    Json,
}

/// Declaration of a single attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub unique: bool,
    pub default: Option<Value>,
}

impl FieldSpec {
    fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            unique: false,
            default: None,
        }
    }

    pub fn text(name: impl Into<String>, max_len: usize) -> Self {
        Self::new(
            name,
            FieldKind::Text {
                max_len: Some(max_len),
            },
        )
    }

    pub fn long_text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text { max_len: None })
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn url(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Url)
    }

    pub fn choice(name: impl Into<String>, options: &[&str]) -> Self {
        Self::new(
            name,
            FieldKind::Choice(options.iter().map(|o| o.to_string()).collect()),
        )
    }

    pub fn reference(name: impl Into<String>, target: EntityType) -> Self {
        Self::new(name, FieldKind::Reference(target))
    }

    pub fn json(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Json)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Check a non-null value against this field's kind.
    pub fn check(&self, value: &Value) -> Result<(), ValidationError> {
        let invalid = |reason: String| ValidationError::InvalidValue {
            field: self.name.clone(),
            reason,
        };

        match &self.kind {
            FieldKind::Text { max_len } => {
                let s = value
                    .as_str()
                    .ok_or_else(|| invalid("expected a string".into()))?;
                if let Some(max) = max_len {
                    let len = s.chars().count();
                    if len > *max {
                        return Err(invalid(format!("length {len} exceeds maximum {max}")));
                    }
                }
                Ok(())
            }
            FieldKind::Integer => match value.as_i64() {
                Some(_) => Ok(()),
                None => Err(invalid("expected an integer".into())),
            },
            FieldKind::Boolean => match value {
                Value::Bool(_) => Ok(()),
                _ => Err(invalid("expected a boolean".into())),
            },
            FieldKind::Url => {
                let s = value
                    .as_str()
                    .ok_or_else(|| invalid("expected a URL string".into()))?;
                if s.len() > MAX_URL_LEN || !URL_PATTERN.is_match(s) {
                    return Err(invalid(format!("'{s}' is not a valid URL")));
                }
                Ok(())
            }
            FieldKind::Choice(options) => {
                let s = value
                    .as_str()
                    .ok_or_else(|| invalid("expected a string".into()))?;
                if options.iter().any(|o| o == s) {
                    Ok(())
                } else {
                    Err(invalid(format!(
                        "'{s}' is not one of {}",
                        options.join(", ")
                    )))
                }
            }
            FieldKind::Reference(target) => match value.as_i64() {
                Some(id) if id > 0 => Ok(()),
                _ => Err(invalid(format!("expected a {target} id"))),
            },
            FieldKind::Json => Ok(()),
        }
    }
}

/// Whether attributes describe a whole new record or a partial update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Required fields must be present; defaults are filled in.
    Create,
    /// Only the supplied fields are checked.
    Patch,
}

/// Whole-record validation hook.
pub type SchemaRule =
    Arc<dyn Fn(&Attributes, ValidationMode) -> Result<(), ValidationError> + Send + Sync>;

/// Field list and validation rules for one entity type.
#[derive(Clone)]
pub struct EntitySchema {
    entity_type: EntityType,
    fields: Vec<FieldSpec>,
    rules: Vec<SchemaRule>,
}

impl EntitySchema {
    pub fn new(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            fields: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Add a field declaration.
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a whole-record rule, run after per-field checks pass.
    pub fn rule<F>(mut self, rule: F) -> Self
    where
        F: Fn(&Attributes, ValidationMode) -> Result<(), ValidationError> + Send + Sync + 'static,
    {
        self.rules.push(Arc::new(rule));
        self
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field_spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields that must hold distinct values across all rows.
    pub fn unique_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.unique)
    }

    /// Reference fields with their target types.
    pub fn references(&self) -> impl Iterator<Item = (&str, &EntityType)> {
        self.fields.iter().filter_map(|f| match &f.kind {
            FieldKind::Reference(target) => Some((f.name.as_str(), target)),
            _ => None,
        })
    }

    /// Validate attributes and return them normalized.
    ///
    /// In [`ValidationMode::Create`] missing fields with defaults are filled
    /// in and missing required fields are rejected. Null clears an optional
    /// field and is rejected for required ones.
    pub fn validate(
        &self,
        attributes: &Attributes,
        mode: ValidationMode,
    ) -> Result<Attributes, ValidationError> {
        for (name, value) in attributes {
            let spec = self
                .field_spec(name)
                .ok_or_else(|| ValidationError::UnknownField {
                    entity_type: self.entity_type.clone(),
                    field: name.clone(),
                })?;

            if value.is_null() {
                if spec.required {
                    return Err(ValidationError::RequiredFieldMissing {
                        field: name.clone(),
                    });
                }
                continue;
            }
            spec.check(value)?;
        }

        let mut normalized = attributes.clone();
        if mode == ValidationMode::Create {
            for spec in &self.fields {
                if normalized.contains_key(&spec.name) {
                    continue;
                }
                match (&spec.default, spec.required) {
                    (Some(default), _) => {
                        normalized.insert(spec.name.clone(), default.clone());
                    }
                    (None, true) => {
                        return Err(ValidationError::RequiredFieldMissing {
                            field: spec.name.clone(),
                        })
                    }
                    (None, false) => {}
                }
            }
        }

        for rule in &self.rules {
            rule(&normalized, mode)?;
        }

        Ok(normalized)
    }
}

impl fmt::Debug for EntitySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitySchema")
            .field("entity_type", &self.entity_type)
            .field("fields", &self.fields)
            .field("rules", &self.rules.len())
            .finish()
    }
}

/// Coerce a JSON value into an attribute object.
pub fn attributes_from_value(value: Value) -> Result<Attributes, ValidationError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ValidationError::NotAnObject),
    }
}
