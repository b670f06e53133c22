//! Filter expressions applied to cached entity lists.
//!
//! Filters are evaluated in memory over the current rows of one entity type.
//! Field names address attributes, plus the `id`, `owner` and `delete_flag`
//! (alias `deleted`) columns. Query strings use a `field__operator=value` syntax.

use crate::entity::Entity;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Filter operator for field comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    /// Equal to (also used for reference ids)
    Eq,
    /// Not equal to
    Ne,
    /// Contains substring, case sensitive
    Contains,
    /// Contains substring, case insensitive
    IContains,
    /// Starts with, case insensitive
    IStartsWith,
}

impl FilterOperator {
    /// Parse the suffix of a `field__op` query key.
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "exact" | "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "contains" => Some(Self::Contains),
            "icontains" => Some(Self::IContains),
            "istartswith" => Some(Self::IStartsWith),
            _ => None,
        }
    }
}

/// A single predicate over a named field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterExpr {
    /// Field to filter on
    pub field: String,
    /// Operator to apply
    pub operator: FilterOperator,
    /// Value to compare against
    pub value: Value,
}

impl FilterExpr {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Create an equality filter.
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOperator::Eq, value)
    }

    /// Create a contains filter.
    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::Contains, Value::String(value.into()))
    }

    /// Parse a `field__op=value` query pair.
    ///
    /// Returns `None` when the suffix is not a known operator. A key with no
    /// suffix is an equality test.
    pub fn from_query(key: &str, value: &str) -> Option<Self> {
        let (field, operator) = match key.rsplit_once("__") {
            Some((field, suffix)) => (field, FilterOperator::from_suffix(suffix)?),
            None => (key, FilterOperator::Eq),
        };
        if field.is_empty() {
            return None;
        }
        Some(Self::new(field, operator, Value::String(value.to_string())))
    }

    /// Evaluate against an entity. Missing fields never match, except for `Ne`.
    pub fn matches(&self, entity: &Entity) -> bool {
        let actual = field_value(entity, &self.field);
        match self.operator {
            FilterOperator::Eq => actual.is_some_and(|v| loose_eq(&v, &self.value)),
            FilterOperator::Ne => !actual.is_some_and(|v| loose_eq(&v, &self.value)),
            FilterOperator::Contains => text_test(actual, &self.value, |a, b| a.contains(b)),
            FilterOperator::IContains => text_test(actual, &self.value, |a, b| {
                a.to_lowercase().contains(&b.to_lowercase())
            }),
            FilterOperator::IStartsWith => text_test(actual, &self.value, |a, b| {
                a.to_lowercase().starts_with(&b.to_lowercase())
            }),
        }
    }
}

/// Conjunction of filter expressions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub exprs: Vec<FilterExpr>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, expr: FilterExpr) -> Self {
        self.exprs.push(expr);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    /// Build a filter from query pairs, skipping keys in `reserved`.
    ///
    /// Unknown operator suffixes are reported as the offending key.
    pub fn from_query_pairs<'a, I>(pairs: I, reserved: &[&str]) -> Result<Self, String>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut filter = Self::new();
        for (key, value) in pairs {
            if reserved.contains(&key) {
                continue;
            }
            let expr = FilterExpr::from_query(key, value).ok_or_else(|| key.to_string())?;
            filter.exprs.push(expr);
        }
        Ok(filter)
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        self.exprs.iter().all(|e| e.matches(entity))
    }

    /// Keep the matching entities, preserving order.
    pub fn apply<'a, I>(&self, entities: I) -> Vec<Entity>
    where
        I: IntoIterator<Item = &'a Entity>,
    {
        entities
            .into_iter()
            .filter(|e| self.matches(e))
            .cloned()
            .collect()
    }
}

fn field_value(entity: &Entity, field: &str) -> Option<Value> {
    match field {
        "id" => Some(Value::from(entity.id)),
        "owner" => entity.owner.map(Value::from),
        "delete_flag" | "deleted" => Some(Value::Bool(entity.deleted)),
        name => entity.attribute(name).filter(|v| !v.is_null()).cloned(),
    }
}

/// Equality that tolerates query-string typing: `"7"` equals `7` and
/// `"true"` equals `true`.
fn loose_eq(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    match (actual, expected) {
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            match (n.as_i64(), s.trim().parse::<i64>()) {
                (Some(a), Ok(b)) => a == b,
                _ => n
                    .as_f64()
                    .zip(s.trim().parse::<f64>().ok())
                    .is_some_and(|(a, b)| a == b),
            }
        }
        (Value::Bool(b), Value::String(s)) | (Value::String(s), Value::Bool(b)) => {
            s.eq_ignore_ascii_case(if *b { "true" } else { "false" })
        }
        _ => false,
    }
}

fn text_test(actual: Option<Value>, expected: &Value, test: impl Fn(&str, &str) -> bool) -> bool {
    match (actual, expected.as_str()) {
        (Some(Value::String(a)), Some(b)) => test(&a, b),
        _ => false,
    }
}
