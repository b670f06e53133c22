//! Profile resources and the profile strength bookkeeping row.

use super::{PROFILE, STRENGTH_STATE};
use crate::services::{elevated_only, owner_or_elevated, ResourceConfig, BASE_STRENGTH};
use danesh_core::{EntitySchema, FieldSpec};
use serde_json::json;

pub fn profile() -> ResourceConfig {
    let schema = EntitySchema::new(PROFILE.clone())
        .field(FieldSpec::integer("profile_strength").with_default(json!(BASE_STRENGTH)))
        .field(FieldSpec::text("bio", 500));
    ResourceConfig::new(schema, owner_or_elevated())
        .with_system_fields(&["profile_strength"])
        .one_per_owner()
}

/// Which one-time strength awards an actor already received. Only the
/// strength bookkeeping writes these flags.
pub fn strength_state() -> ResourceConfig {
    let schema = EntitySchema::new(STRENGTH_STATE.clone())
        .field(FieldSpec::boolean("post_obtained").with_default(json!(false)))
        .field(FieldSpec::boolean("supply_demand_obtained").with_default(json!(false)))
        .field(FieldSpec::boolean("hashtags_obtained").with_default(json!(false)));
    ResourceConfig::new(schema, elevated_only())
        .with_system_fields(&["post_obtained", "supply_demand_obtained", "hashtags_obtained"])
        .one_per_owner()
}
