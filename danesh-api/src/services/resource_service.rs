//! Resource Service
//!
//! Per-type access layer over the shared store: filtered listing plus
//! writes gated by an ownership rule.

use danesh_core::{
    Actor, Attributes, DaneshError, DaneshResult, Entity, EntityId, EntitySchema, EntityType,
    Filter, Timestamp, ValidationError, WriteAction,
};
use danesh_storage::CacheCoherentStore;
use std::sync::Arc;

/// Decides whether an actor may write an entity. Creates are checked
/// against the candidate row, owned by the creating actor.
pub type OwnershipRule = Arc<dyn Fn(&Entity, &Actor) -> bool + Send + Sync>;

/// The owner or any elevated actor may write.
pub fn owner_or_elevated() -> OwnershipRule {
    Arc::new(|entity, actor| actor.is_elevated() || entity.is_owned_by(actor.id))
}

/// Only elevated actors may write.
pub fn elevated_only() -> OwnershipRule {
    Arc::new(|_, actor| actor.is_elevated())
}

/// Everything one entity type needs: its schema, its write rule and the
/// fields only the server may write.
#[derive(Clone)]
pub struct ResourceConfig {
    pub schema: EntitySchema,
    pub rule: OwnershipRule,
    pub system_fields: Vec<&'static str>,
    pub one_per_owner: bool,
}

impl ResourceConfig {
    pub fn new(schema: EntitySchema, rule: OwnershipRule) -> Self {
        Self {
            schema,
            rule,
            system_fields: Vec::new(),
            one_per_owner: false,
        }
    }

    /// Fields clients may not set on create or update.
    pub fn with_system_fields(mut self, fields: &[&'static str]) -> Self {
        self.system_fields = fields.to_vec();
        self
    }

    /// Refuse a create when the actor already owns a current row.
    pub fn one_per_owner(mut self) -> Self {
        self.one_per_owner = true;
        self
    }

    pub fn entity_type(&self) -> &EntityType {
        self.schema.entity_type()
    }
}

impl std::fmt::Debug for ResourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceConfig")
            .field("schema", &self.schema)
            .field("rule", &"<OwnershipRule>")
            .field("system_fields", &self.system_fields)
            .field("one_per_owner", &self.one_per_owner)
            .finish()
    }
}

/// Access layer for one entity type.
#[derive(Clone)]
pub struct ResourceService {
    store: Arc<CacheCoherentStore>,
    entity_type: EntityType,
    rule: OwnershipRule,
    system_fields: Arc<[&'static str]>,
    one_per_owner: bool,
}

impl ResourceService {
    /// Register the type with the store and build its service.
    pub async fn register(
        store: Arc<CacheCoherentStore>,
        config: ResourceConfig,
    ) -> DaneshResult<Self> {
        let entity_type = config.entity_type().clone();
        store.register(config.schema).await?;
        Ok(Self {
            store,
            entity_type,
            rule: config.rule,
            system_fields: config.system_fields.into(),
            one_per_owner: config.one_per_owner,
        })
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    /// Current rows matching every predicate of `filter`, most recent first.
    pub async fn list(&self, filter: &Filter) -> DaneshResult<Vec<Entity>> {
        let rows = self.store.list(&self.entity_type).await?;
        Ok(filter.apply(rows.iter()))
    }

    pub async fn get(&self, id: EntityId) -> DaneshResult<Entity> {
        self.store.get(&self.entity_type, id).await
    }

    pub async fn create(&self, attributes: Attributes, actor: &Actor) -> DaneshResult<Entity> {
        self.reject_system_fields(&attributes)?;
        let candidate = Entity {
            id: 0,
            entity_type: self.entity_type.clone(),
            created_at: Timestamp::default(),
            updated_at: Timestamp::default(),
            deleted: false,
            owner: Some(actor.id),
            attributes,
        };
        self.authorize(&candidate, actor, WriteAction::Create)?;
        if self.one_per_owner {
            let rows = self.store.list(&self.entity_type).await?;
            if rows.iter().any(|row| row.is_owned_by(actor.id)) {
                return Err(DaneshError::constraint(
                    format!("{}.owner", self.entity_type),
                    format!("actor {} already has a {}", actor.id, self.entity_type),
                ));
            }
        }
        self.store
            .create(&self.entity_type, Some(actor.id), candidate.attributes)
            .await
    }

    pub async fn update(
        &self,
        id: EntityId,
        attributes: Attributes,
        actor: &Actor,
    ) -> DaneshResult<Entity> {
        self.reject_system_fields(&attributes)?;
        let current = self.get(id).await?;
        self.authorize(&current, actor, WriteAction::Update)?;
        self.store.update(&self.entity_type, id, attributes).await
    }

    pub async fn delete(&self, id: EntityId, actor: &Actor) -> DaneshResult<()> {
        let current = self.get(id).await?;
        self.authorize(&current, actor, WriteAction::Delete)?;
        self.store.soft_delete(&self.entity_type, id).await
    }

    fn reject_system_fields(&self, attributes: &Attributes) -> DaneshResult<()> {
        match self.system_fields.iter().find(|f| attributes.contains_key(**f)) {
            Some(field) => Err(ValidationError::InvalidValue {
                field: field.to_string(),
                reason: "maintained by the server".into(),
            }
            .into()),
            None => Ok(()),
        }
    }

    fn authorize(&self, entity: &Entity, actor: &Actor, action: WriteAction) -> DaneshResult<()> {
        if (self.rule)(entity, actor) {
            return Ok(());
        }
        tracing::warn!(
            entity_type = %self.entity_type,
            id = entity.id,
            actor = actor.id,
            action = %action,
            "write rejected by ownership rule"
        );
        Err(DaneshError::Forbidden {
            entity_type: self.entity_type.clone(),
            action,
            actor: actor.id,
        })
    }
}

impl std::fmt::Debug for ResourceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceService")
            .field("entity_type", &self.entity_type)
            .field("system_fields", &self.system_fields)
            .finish_non_exhaustive()
    }
}
