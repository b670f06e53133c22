//! The acting user behind a request.

use crate::entity::ActorId;
use serde::{Deserialize, Serialize};

/// Identity resolved by the authentication collaborator.
///
/// `elevated` is decided by whoever resolves the actor (for example from a
/// configured list of staff roles) and grants access regardless of
/// ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub elevated: bool,
}

impl Actor {
    pub fn new(id: ActorId) -> Self {
        Self {
            id,
            roles: Vec::new(),
            elevated: false,
        }
    }

    /// An actor with staff privileges.
    pub fn elevated(id: ActorId) -> Self {
        Self {
            id,
            roles: vec!["admin".to_string()],
            elevated: true,
        }
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_elevated(&self) -> bool {
        self.elevated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_do_not_imply_elevation() {
        let actor = Actor::new(3).with_roles(vec!["admin".into()]);
        assert!(actor.has_role("admin"));
        assert!(!actor.is_elevated());
        assert!(Actor::elevated(1).is_elevated());
    }
}
