//! API Configuration Module
//!
//! Settings for the HTTP layer, the table cache and the storage backend.
//! Values come from `DANESH_*` environment variables with development
//! defaults.

use danesh_core::ConfigError;
use std::time::Duration;

/// Which storage backend the server runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// Process-local tables, lost on restart.
    Memory,
    /// Postgres through a deadpool connection pool.
    Postgres,
}

impl std::str::FromStr for StorageKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            other => Err(ConfigError::InvalidValue {
                field: "DANESH_STORAGE".to_string(),
                value: other.to_string(),
                reason: "expected 'memory' or 'postgres'".to_string(),
            }),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    /// Lifetime of a table cache entry.
    pub cache_ttl: Duration,

    pub storage: StorageKind,

    /// Roles that grant access regardless of ownership.
    pub elevated_roles: Vec<String>,

    pub log_format: LogFormat,

    /// Page size used when a list request does not ask for one.
    pub default_page_size: usize,

    /// Largest page a single list request may ask for.
    pub max_page_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            cors_max_age_secs: 86400,
            cache_ttl: danesh_storage::DEFAULT_ENTRY_TTL,
            storage: StorageKind::Memory,
            elevated_roles: vec!["admin".to_string(), "staff".to_string()],
            log_format: LogFormat::Json,
            default_page_size: 100,
            max_page_size: 1000,
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Role names compare case-insensitively; keep them lowercase.
pub(crate) fn normalize_roles<I, S>(roles: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    roles
        .into_iter()
        .map(|r| r.as_ref().trim().to_lowercase())
        .filter(|r| !r.is_empty())
        .collect()
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `DANESH_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `DANESH_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `DANESH_CACHE_TTL_SECS`: Table cache entry lifetime (default: 86400)
    /// - `DANESH_STORAGE`: `memory` or `postgres` (default: memory)
    /// - `DANESH_ELEVATED_ROLES`: Comma-separated staff roles (default: admin,staff)
    /// - `DANESH_LOG_FORMAT`: `json` or `pretty` (default: json)
    /// - `DANESH_DEFAULT_PAGE_SIZE` / `DANESH_MAX_PAGE_SIZE`: list paging (100 / 1000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable numbers fall back to
    /// the default; an unknown storage kind is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let cors_origins = lookup("DANESH_CORS_ORIGINS")
            .map(|s| split_list(&s))
            .unwrap_or_default();

        let cors_max_age_secs = lookup("DANESH_CORS_MAX_AGE_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.cors_max_age_secs);

        let cache_ttl = lookup("DANESH_CACHE_TTL_SECS")
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.cache_ttl);

        let storage = match lookup("DANESH_STORAGE") {
            Some(value) => value.parse()?,
            None => defaults.storage,
        };

        let elevated_roles = lookup("DANESH_ELEVATED_ROLES")
            .map(|s| normalize_roles(s.split(',')))
            .unwrap_or(defaults.elevated_roles);

        let log_format = match lookup("DANESH_LOG_FORMAT").as_deref() {
            Some("pretty") | Some("text") => LogFormat::Pretty,
            _ => LogFormat::Json,
        };

        let default_page_size = lookup("DANESH_DEFAULT_PAGE_SIZE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.default_page_size);

        let max_page_size = lookup("DANESH_MAX_PAGE_SIZE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_page_size);

        let config = Self {
            cors_origins,
            cors_max_age_secs,
            cache_ttl,
            storage,
            elevated_roles,
            log_format,
            default_page_size,
            max_page_size,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_storage(mut self, storage: StorageKind) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_elevated_roles(mut self, roles: Vec<String>) -> Self {
        self.elevated_roles = normalize_roles(roles);
        self
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "DANESH_CACHE_TTL_SECS".to_string(),
                value: "0".to_string(),
                reason: "cache entries must live for at least one second".to_string(),
            });
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(ConfigError::InvalidValue {
                field: "DANESH_DEFAULT_PAGE_SIZE".to_string(),
                value: self.default_page_size.to_string(),
                reason: format!("must be between 1 and {}", self.max_page_size),
            });
        }
        Ok(())
    }

    /// Check if running in production mode (strict CORS).
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }

    /// Check if a given origin is allowed. `*.example.com` entries admit
    /// https subdomains.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }

        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            match (allowed.strip_prefix("*."), origin.strip_prefix("https://")) {
                (Some(domain), Some(host)) => host
                    .strip_suffix(domain)
                    .is_some_and(|sub| sub.ends_with('.') && sub.len() > 1),
                _ => false,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert!(config.cors_origins.is_empty());
        assert_eq!(config.cache_ttl, Duration::from_secs(86400));
        assert_eq!(config.storage, StorageKind::Memory);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_reads_values() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("DANESH_CACHE_TTL_SECS", "30"),
            ("DANESH_STORAGE", "postgres"),
            ("DANESH_ELEVATED_ROLES", "Moderator, ADMIN,"),
            ("DANESH_LOG_FORMAT", "pretty"),
            ("DANESH_CORS_ORIGINS", "https://danesh.app,"),
        ]))
        .unwrap();
        assert_eq!(config.cache_ttl, Duration::from_secs(30));
        assert_eq!(config.storage, StorageKind::Postgres);
        assert_eq!(config.elevated_roles, vec!["moderator", "admin"]);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.cors_origins, vec!["https://danesh.app"]);
    }

    #[test]
    fn test_invalid_values() {
        assert!(ApiConfig::from_lookup(lookup(&[("DANESH_STORAGE", "redis")])).is_err());
        assert!(ApiConfig::from_lookup(lookup(&[("DANESH_CACHE_TTL_SECS", "0")])).is_err());
        assert!(ApiConfig::from_lookup(lookup(&[("DANESH_DEFAULT_PAGE_SIZE", "5000")])).is_err());
        // unparseable numbers fall back to defaults
        let config = ApiConfig::from_lookup(lookup(&[("DANESH_CACHE_TTL_SECS", "soon")])).unwrap();
        assert_eq!(config.cache_ttl, Duration::from_secs(86400));
    }

    #[test]
    fn test_origin_allowed() {
        let mut config = ApiConfig::default();
        assert!(config.is_origin_allowed("https://anything.com"));

        config.cors_origins = vec!["https://danesh.app".to_string(), "*.danesh.app".to_string()];
        assert!(config.is_origin_allowed("https://danesh.app"));
        assert!(config.is_origin_allowed("https://api.danesh.app"));
        assert!(!config.is_origin_allowed("https://evildanesh.app"));
        assert!(!config.is_origin_allowed("http://api.danesh.app"));
    }

    #[test]
    fn test_builder_overrides() {
        let config = ApiConfig::default()
            .with_cache_ttl(Duration::from_secs(5))
            .with_storage(StorageKind::Postgres)
            .with_elevated_roles(vec![" Owner ".to_string(), "STAFF".to_string()]);
        assert_eq!(config.cache_ttl, Duration::from_secs(5));
        assert_eq!(config.storage, StorageKind::Postgres);
        assert_eq!(config.elevated_roles, vec!["owner", "staff"]);
        assert!(config.validate().is_ok());

        let zero = ApiConfig::default().with_cache_ttl(Duration::ZERO);
        assert!(zero.validate().is_err());
    }
}
