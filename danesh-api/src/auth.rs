//! Actor Resolution
//!
//! Identity is established upstream; the service only reads who is calling.
//! The gateway forwards the actor id and roles as request headers and
//! [`HeaderActorResolver`] turns them into an [`Actor`].

use crate::config::normalize_roles;
use crate::error::{ApiError, ApiResult};
use axum::http::HeaderMap;
use danesh_core::{Actor, ActorId};
use std::sync::Arc;

/// Header carrying the numeric actor id.
pub const ACTOR_ID_HEADER: &str = "x-actor-id";

/// Header carrying the actor's roles, comma separated.
pub const ACTOR_ROLES_HEADER: &str = "x-actor-roles";

/// Resolves the calling actor from request headers.
pub trait ActorResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> ApiResult<Actor>;
}

/// Reads identity from the `x-actor-id` and `x-actor-roles` headers.
#[derive(Debug, Clone)]
pub struct HeaderActorResolver {
    elevated_roles: Arc<Vec<String>>,
}

impl HeaderActorResolver {
    /// Actors holding any of `elevated_roles` get elevated access. Role
    /// names match case-insensitively.
    pub fn new(elevated_roles: Vec<String>) -> Self {
        Self {
            elevated_roles: Arc::new(normalize_roles(elevated_roles)),
        }
    }

    fn parse_id(value: &str) -> ApiResult<ActorId> {
        value
            .trim()
            .parse::<ActorId>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| ApiError::unauthorized(format!("Malformed {ACTOR_ID_HEADER} header")))
    }
}

impl ActorResolver for HeaderActorResolver {
    fn resolve(&self, headers: &HeaderMap) -> ApiResult<Actor> {
        let id_header = headers
            .get(ACTOR_ID_HEADER)
            .ok_or_else(|| ApiError::unauthorized("Actor identity required"))?;
        let id = id_header
            .to_str()
            .map_err(|_| ApiError::unauthorized(format!("Malformed {ACTOR_ID_HEADER} header")))
            .and_then(Self::parse_id)?;

        let roles: Vec<String> = headers
            .get(ACTOR_ROLES_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(|value| normalize_roles(value.split(',')))
            .unwrap_or_default();

        let elevated = roles.iter().any(|r| self.elevated_roles.contains(r));
        let mut actor = Actor::new(id).with_roles(roles);
        actor.elevated = elevated;
        Ok(actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use axum::http::HeaderValue;

    fn resolver() -> HeaderActorResolver {
        HeaderActorResolver::new(vec!["admin".to_string(), "staff".to_string()])
    }

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_resolves_plain_actor() {
        let actor = resolver()
            .resolve(&headers(&[(ACTOR_ID_HEADER, "42"), (ACTOR_ROLES_HEADER, "member")]))
            .unwrap();
        assert_eq!(actor.id, 42);
        assert!(actor.has_role("member"));
        assert!(!actor.is_elevated());
    }

    #[test]
    fn test_elevated_role() {
        let actor = resolver()
            .resolve(&headers(&[(ACTOR_ID_HEADER, "7"), (ACTOR_ROLES_HEADER, "member, Staff")]))
            .unwrap();
        assert!(actor.is_elevated());
    }

    #[test]
    fn test_missing_or_malformed_id_is_unauthorized() {
        for pairs in [
            &[][..],
            &[(ACTOR_ID_HEADER, "abc")][..],
            &[(ACTOR_ID_HEADER, "0")][..],
            &[(ACTOR_ID_HEADER, "-3")][..],
        ] {
            let err = resolver().resolve(&headers(pairs)).unwrap_err();
            assert_eq!(err.code, ErrorCode::Unauthorized);
        }
    }

    #[test]
    fn test_configured_roles_match_case_insensitively() {
        let resolver = HeaderActorResolver::new(vec!["Admin".to_string(), " Staff ".to_string()]);
        for roles in ["admin", "ADMIN", "staff"] {
            let actor = resolver
                .resolve(&headers(&[(ACTOR_ID_HEADER, "3"), (ACTOR_ROLES_HEADER, roles)]))
                .unwrap();
            assert!(actor.is_elevated(), "{roles} should be elevated");
        }
        let actor = resolver
            .resolve(&headers(&[(ACTOR_ID_HEADER, "3"), (ACTOR_ROLES_HEADER, "member")]))
            .unwrap();
        assert!(!actor.is_elevated());
    }
}
