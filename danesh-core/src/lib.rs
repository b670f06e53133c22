//! danesh core - entity model
//!
//! Data types shared by every other crate: entities and entity types,
//! per-type schemas, in-memory filters, the acting user, clocks, errors and
//! health reports. No storage or transport code lives here.

pub mod actor;
pub mod clock;
pub mod entity;
pub mod error;
pub mod filter;
pub mod health;
pub mod schema;

pub use actor::Actor;
pub use clock::{Clock, ManualClock, SystemClock};
pub use entity::{ActorId, Attributes, Entity, EntityId, EntityType, NewEntity, Timestamp};
pub use error::{ConfigError, DaneshError, DaneshResult, ValidationError, WriteAction};
pub use filter::{Filter, FilterExpr, FilterOperator};
pub use health::{overall_status, ComponentHealth, HealthStatus};
pub use schema::{
    attributes_from_value, EntitySchema, FieldKind, FieldSpec, SchemaRule, ValidationMode,
};
