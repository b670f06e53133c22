//! Built-in resource configurations.
//!
//! Each entity type served by the API is described by a
//! [`ResourceConfig`]: its schema plus the ownership rule gating writes.
//! [`catalog`] lists them in registration order; referenced types come
//! before the types that reference them.

mod marketplace;
mod profile;

pub use marketplace::*;
pub use profile::*;

use crate::services::ResourceConfig;
use danesh_core::EntityType;
use once_cell::sync::Lazy;

pub static POST: Lazy<EntityType> = Lazy::new(|| EntityType::from_static("post"));
pub static PRODUCT: Lazy<EntityType> = Lazy::new(|| EntityType::from_static("product"));
pub static ORGANIZATION: Lazy<EntityType> = Lazy::new(|| EntityType::from_static("organization"));
pub static EXCHANGE: Lazy<EntityType> = Lazy::new(|| EntityType::from_static("exchange"));
pub static COMMENT: Lazy<EntityType> = Lazy::new(|| EntityType::from_static("comment"));
pub static HASHTAG: Lazy<EntityType> = Lazy::new(|| EntityType::from_static("hashtag"));
pub static CATEGORY: Lazy<EntityType> = Lazy::new(|| EntityType::from_static("category"));
pub static PROFILE: Lazy<EntityType> = Lazy::new(|| EntityType::from_static("profile"));
pub static STRENGTH_STATE: Lazy<EntityType> =
    Lazy::new(|| EntityType::from_static("strength_state"));

/// Every built-in resource.
pub fn catalog() -> Vec<ResourceConfig> {
    vec![
        post(),
        product(),
        organization(),
        exchange(),
        comment(),
        hashtag(),
        category(),
        profile(),
        strength_state(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_types_are_distinct() {
        let configs = catalog();
        let names: HashSet<_> = configs.iter().map(|c| c.entity_type().clone()).collect();
        assert_eq!(names.len(), configs.len());
        assert!(names.contains(&*STRENGTH_STATE));
    }

    #[test]
    fn test_references_point_into_catalog() {
        let configs = catalog();
        let names: HashSet<_> = configs.iter().map(|c| c.entity_type().clone()).collect();
        for config in &configs {
            for (field, target) in config.schema.references() {
                assert!(
                    names.contains(target),
                    "{}.{field} references unknown type {target}",
                    config.entity_type()
                );
            }
        }
    }
}
