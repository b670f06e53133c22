//! Profile Strength
//!
//! Awards profile strength points for an actor's first posts and hashtags.
//! Each award fires at most once per actor; the `strength_state` row records
//! which ones were granted. Bookkeeping rows are written straight to the
//! store since they belong to the system, not to the acting user.

use danesh_core::{
    Actor, ActorId, Attributes, DaneshResult, Entity, EntityType, Filter, FilterExpr,
};
use danesh_storage::CacheCoherentStore;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::components::{HASHTAG, POST, PROFILE, STRENGTH_STATE};

/// Strength of a freshly created profile.
pub const BASE_STRENGTH: i64 = 10;
/// First post of type `post`.
pub const POST_AWARD: i64 = 5;
/// First `supply` or `demand` post.
pub const SUPPLY_DEMAND_AWARD: i64 = 10;
/// Reaching [`HASHTAG_THRESHOLD`] hashtags.
pub const HASHTAG_AWARD: i64 = 10;
pub const HASHTAG_THRESHOLD: usize = 3;

/// One-time awards tracked per actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrengthAward {
    FirstPost,
    FirstSupplyDemand,
    Hashtags,
}

impl StrengthAward {
    /// Flag column in `strength_state`.
    pub fn flag(self) -> &'static str {
        match self {
            Self::FirstPost => "post_obtained",
            Self::FirstSupplyDemand => "supply_demand_obtained",
            Self::Hashtags => "hashtags_obtained",
        }
    }

    pub fn points(self) -> i64 {
        match self {
            Self::FirstPost => POST_AWARD,
            Self::FirstSupplyDemand => SUPPLY_DEMAND_AWARD,
            Self::Hashtags => HASHTAG_AWARD,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProfileStrengthService {
    store: Arc<CacheCoherentStore>,
}

impl ProfileStrengthService {
    pub fn new(store: Arc<CacheCoherentStore>) -> Self {
        Self { store }
    }

    /// React to a newly created entity. Returns the award granted, if any.
    pub async fn record_created(
        &self,
        entity: &Entity,
        actor: &Actor,
    ) -> DaneshResult<Option<StrengthAward>> {
        let award = match entity.entity_type.as_str() {
            t if t == POST.as_str() => match entity.str_attribute("post_type") {
                Some("supply") | Some("demand") => StrengthAward::FirstSupplyDemand,
                _ => StrengthAward::FirstPost,
            },
            t if t == HASHTAG.as_str() => {
                if self.owned(&HASHTAG, actor.id).await?.len() < HASHTAG_THRESHOLD {
                    return Ok(None);
                }
                StrengthAward::Hashtags
            }
            _ => return Ok(None),
        };

        let state = self.state_of(actor.id).await?;
        if state.attribute(award.flag()) == Some(&Value::Bool(true)) {
            return Ok(None);
        }

        let profile = self.profile_of(actor.id).await?;
        let strength = profile
            .attribute("profile_strength")
            .and_then(Value::as_i64)
            .unwrap_or(BASE_STRENGTH)
            + award.points();

        self.store
            .update(&PROFILE, profile.id, patch("profile_strength", json!(strength)))
            .await?;
        self.store
            .update(&STRENGTH_STATE, state.id, patch(award.flag(), json!(true)))
            .await?;

        tracing::info!(
            actor = actor.id,
            award = ?award,
            strength,
            "profile strength awarded"
        );
        Ok(Some(award))
    }

    /// Current strength of an actor's profile, creating the profile if needed.
    pub async fn strength_of(&self, actor: ActorId) -> DaneshResult<i64> {
        let profile = self.profile_of(actor).await?;
        Ok(profile
            .attribute("profile_strength")
            .and_then(Value::as_i64)
            .unwrap_or(BASE_STRENGTH))
    }

    async fn owned(&self, entity_type: &EntityType, actor: ActorId) -> DaneshResult<Vec<Entity>> {
        let rows = self.store.list(entity_type).await?;
        Ok(Filter::new()
            .and(FilterExpr::eq("owner", json!(actor)))
            .apply(rows.iter()))
    }

    async fn first_or_create(&self, entity_type: &EntityType, actor: ActorId) -> DaneshResult<Entity> {
        // Oldest row wins if duplicates ever exist.
        if let Some(existing) = self.owned(entity_type, actor).await?.pop() {
            return Ok(existing);
        }
        self.store
            .create(entity_type, Some(actor), Attributes::new())
            .await
    }

    async fn profile_of(&self, actor: ActorId) -> DaneshResult<Entity> {
        self.first_or_create(&PROFILE, actor).await
    }

    async fn state_of(&self, actor: ActorId) -> DaneshResult<Entity> {
        self.first_or_create(&STRENGTH_STATE, actor).await
    }
}

fn patch(field: &str, value: Value) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert(field.to_string(), value);
    attributes
}
