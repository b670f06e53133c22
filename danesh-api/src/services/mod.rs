//! Service Layer
//!
//! Per-type resource services, the registry both facades dispatch through,
//! and the profile strength bookkeeping triggered by creates.

mod registry;
mod resource_service;
mod strength_service;

pub use registry::*;
pub use resource_service::*;
pub use strength_service::*;
