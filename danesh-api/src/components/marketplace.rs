//! Marketplace resources: posts, products, organizations, exchanges and
//! their comments, hashtags and categories.

use super::{CATEGORY, COMMENT, EXCHANGE, HASHTAG, ORGANIZATION, POST, PRODUCT};
use crate::services::{elevated_only, owner_or_elevated, ResourceConfig};
use danesh_core::{Attributes, EntitySchema, FieldSpec, ValidationError, ValidationMode};
use serde_json::{json, Value};

fn non_negative(
    field: &'static str,
) -> impl Fn(&Attributes, ValidationMode) -> Result<(), ValidationError> + Send + Sync + 'static {
    move |attributes: &Attributes, _mode: ValidationMode| match attributes.get(field).and_then(Value::as_i64) {
        Some(n) if n < 0 => Err(ValidationError::InvalidValue {
            field: field.to_string(),
            reason: "must not be negative".to_string(),
        }),
        _ => Ok(()),
    }
}

pub fn post() -> ResourceConfig {
    let schema = EntitySchema::new(POST.clone())
        .field(
            FieldSpec::choice("post_type", &["supply", "demand", "post"]).with_default(json!("post")),
        )
        .field(FieldSpec::text("post_title", 100))
        .field(FieldSpec::text("post_description", 300))
        .field(FieldSpec::reference("post_parent", POST.clone()))
        .field(FieldSpec::boolean("post_pinned").with_default(json!(false)));
    ResourceConfig::new(schema, owner_or_elevated())
}

pub fn product() -> ResourceConfig {
    let schema = EntitySchema::new(PRODUCT.clone())
        .field(FieldSpec::text("name", 100).required())
        .field(FieldSpec::text("description", 1000))
        .field(FieldSpec::url("link"))
        .field(FieldSpec::integer("price"))
        .field(FieldSpec::reference("product_parent", PRODUCT.clone()))
        .rule(non_negative("price"));
    ResourceConfig::new(schema, owner_or_elevated())
}

pub fn organization() -> ResourceConfig {
    let schema = EntitySchema::new(ORGANIZATION.clone())
        .field(FieldSpec::text("name", 100).required().unique())
        .field(FieldSpec::text("bio", 500))
        .field(FieldSpec::url("link"))
        .field(FieldSpec::integer("established"))
        .rule(non_negative("established"));
    ResourceConfig::new(schema, owner_or_elevated())
}

pub fn exchange() -> ResourceConfig {
    let schema = EntitySchema::new(EXCHANGE.clone())
        .field(FieldSpec::text("name", 30).required())
        .field(FieldSpec::url("link"))
        .field(FieldSpec::text("description", 300))
        .field(FieldSpec::boolean("private").with_default(json!(false)))
        .field(FieldSpec::integer("members_count").with_default(json!(100)))
        .field(FieldSpec::boolean("active_flag").with_default(json!(true)))
        .rule(non_negative("members_count"));
    ResourceConfig::new(schema, owner_or_elevated())
}

pub fn comment() -> ResourceConfig {
    let schema = EntitySchema::new(COMMENT.clone())
        .field(FieldSpec::reference("comment_parent", POST.clone()).required())
        .field(FieldSpec::text("text", 1000).required());
    ResourceConfig::new(schema, owner_or_elevated())
}

pub fn hashtag() -> ResourceConfig {
    let schema = EntitySchema::new(HASHTAG.clone())
        .field(FieldSpec::text("title", 50).required());
    ResourceConfig::new(schema, owner_or_elevated())
}

pub fn category() -> ResourceConfig {
    let schema = EntitySchema::new(CATEGORY.clone())
        .field(FieldSpec::text("title", 50).required().unique())
        .field(FieldSpec::reference("parent", CATEGORY.clone()));
    ResourceConfig::new(schema, elevated_only())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(value: Value) -> Attributes {
        danesh_core::attributes_from_value(value).unwrap()
    }

    #[test]
    fn test_post_defaults() {
        let config = post();
        let normalized = config
            .schema
            .validate(&attrs(json!({"post_title": "hello"})), ValidationMode::Create)
            .unwrap();
        assert_eq!(normalized["post_type"], json!("post"));
        assert_eq!(normalized["post_pinned"], json!(false));
    }

    #[test]
    fn test_post_type_is_a_choice() {
        let err = post()
            .schema
            .validate(&attrs(json!({"post_type": "auction"})), ValidationMode::Create)
            .unwrap_err();
        assert_eq!(err.field(), Some("post_type"));
    }

    #[test]
    fn test_negative_price_rejected() {
        let schema = product().schema;
        assert!(schema
            .validate(&attrs(json!({"name": "lamp", "price": -1})), ValidationMode::Create)
            .is_err());
        assert!(schema
            .validate(&attrs(json!({"price": 0})), ValidationMode::Patch)
            .is_ok());
    }

    #[test]
    fn test_comment_requires_parent() {
        let err = comment()
            .schema
            .validate(&attrs(json!({"text": "nice"})), ValidationMode::Create)
            .unwrap_err();
        assert!(matches!(err, ValidationError::RequiredFieldMissing { .. }));
    }

    #[test]
    fn test_exchange_name_length() {
        let err = exchange()
            .schema
            .validate(&attrs(json!({"name": "x".repeat(31)})), ValidationMode::Create)
            .unwrap_err();
        assert_eq!(err.field(), Some("name"));
    }

    #[test]
    fn test_hashtag_titles_may_repeat() {
        assert_eq!(hashtag().schema.unique_fields().count(), 0);
        assert_eq!(category().schema.unique_fields().count(), 1);
    }
}
