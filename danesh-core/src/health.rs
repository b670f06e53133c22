//! Health report types shared by the storage and API crates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Health status of the service or one of its components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Result of probing one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub component: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<i64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub details: BTreeMap<String, serde_json::Value>,
}

impl ComponentHealth {
    pub fn healthy(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Healthy,
            message: None,
            latency_ms: None,
            details: BTreeMap::new(),
        }
    }

    pub fn unhealthy(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            message: Some(message.into()),
            ..Self::healthy(component)
        }
    }

    pub fn with_latency(mut self, ms: i64) -> Self {
        self.latency_ms = Some(ms);
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }
}

/// Overall status: the worst status among the components, healthy if none.
pub fn overall_status<'a, I>(components: I) -> HealthStatus
where
    I: IntoIterator<Item = &'a ComponentHealth>,
{
    components
        .into_iter()
        .map(|c| c.status)
        .max()
        .unwrap_or(HealthStatus::Healthy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_is_worst() {
        let checks = [
            ComponentHealth::healthy("cache"),
            ComponentHealth::unhealthy("storage", "connection refused"),
        ];
        assert_eq!(overall_status(&checks), HealthStatus::Unhealthy);
        assert_eq!(overall_status(&checks[..1]), HealthStatus::Healthy);
        assert_eq!(overall_status(&[]), HealthStatus::Healthy);
    }

    #[test]
    fn test_serialization_skips_empty() -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(ComponentHealth::healthy("cache").with_latency(2))?;
        assert_eq!(value["status"], "healthy");
        assert_eq!(value["latency_ms"], 2);
        assert!(value.get("message").is_none());
        assert!(value.get("details").is_none());
        Ok(())
    }
}
