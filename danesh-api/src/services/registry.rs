//! Resource Registry
//!
//! Maps entity type names to their services. REST and GraphQL handlers both
//! go through it, so follow-up work on writes (profile strength) happens in
//! one place.

use danesh_core::{
    Actor, Attributes, DaneshResult, Entity, EntityId, EntityType, Filter, ValidationError,
};
use danesh_storage::CacheCoherentStore;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{ProfileStrengthService, ResourceConfig, ResourceService};
use crate::components::{catalog, HASHTAG, POST, PROFILE, STRENGTH_STATE};

pub struct ResourceRegistry {
    store: Arc<CacheCoherentStore>,
    services: BTreeMap<EntityType, ResourceService>,
    strength: Option<ProfileStrengthService>,
}

impl ResourceRegistry {
    /// Register every config with the store, in order.
    ///
    /// Profile strength tracking is enabled when both `profile` and
    /// `strength_state` are among the configs.
    pub async fn build(
        store: Arc<CacheCoherentStore>,
        configs: Vec<ResourceConfig>,
    ) -> DaneshResult<Self> {
        let mut services = BTreeMap::new();
        for config in configs {
            let service = ResourceService::register(Arc::clone(&store), config).await?;
            services.insert(service.entity_type().clone(), service);
        }

        let strength = (services.contains_key(&*PROFILE) && services.contains_key(&*STRENGTH_STATE))
            .then(|| ProfileStrengthService::new(Arc::clone(&store)));

        tracing::info!(
            entity_types = services.len(),
            profile_strength = strength.is_some(),
            "resource registry ready"
        );
        Ok(Self {
            store,
            services,
            strength,
        })
    }

    /// Registry over the built-in catalog.
    pub async fn with_catalog(store: Arc<CacheCoherentStore>) -> DaneshResult<Self> {
        Self::build(store, catalog()).await
    }

    pub fn store(&self) -> &Arc<CacheCoherentStore> {
        &self.store
    }

    pub fn strength(&self) -> Option<&ProfileStrengthService> {
        self.strength.as_ref()
    }

    pub fn entity_types(&self) -> impl Iterator<Item = &EntityType> {
        self.services.keys()
    }

    /// Look up a service by type name.
    pub fn service(&self, name: &str) -> DaneshResult<&ResourceService> {
        let unknown = || ValidationError::UnknownEntityType {
            name: name.to_string(),
        };
        let entity_type = EntityType::new(name).map_err(|_| unknown())?;
        Ok(self.services.get(&entity_type).ok_or_else(unknown)?)
    }

    pub async fn list(&self, entity_type: &str, filter: &Filter) -> DaneshResult<Vec<Entity>> {
        self.service(entity_type)?.list(filter).await
    }

    pub async fn get(&self, entity_type: &str, id: EntityId) -> DaneshResult<Entity> {
        self.service(entity_type)?.get(id).await
    }

    /// Create an entity, then update the creator's profile strength.
    pub async fn create(
        &self,
        entity_type: &str,
        attributes: Attributes,
        actor: &Actor,
    ) -> DaneshResult<Entity> {
        let entity = self.service(entity_type)?.create(attributes, actor).await?;
        if let Some(strength) = &self.strength {
            if entity.entity_type == *POST || entity.entity_type == *HASHTAG {
                strength.record_created(&entity, actor).await?;
            }
        }
        Ok(entity)
    }

    pub async fn update(
        &self,
        entity_type: &str,
        id: EntityId,
        attributes: Attributes,
        actor: &Actor,
    ) -> DaneshResult<Entity> {
        self.service(entity_type)?.update(id, attributes, actor).await
    }

    pub async fn delete(&self, entity_type: &str, id: EntityId, actor: &Actor) -> DaneshResult<()> {
        self.service(entity_type)?.delete(id, actor).await
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("entity_types", &self.services.keys().collect::<Vec<_>>())
            .field("profile_strength", &self.strength.is_some())
            .finish()
    }
}
