//! Health Check Endpoints
//!
//! Provides Kubernetes-compatible health check endpoints:
//! - /health/ping - Simple liveness check
//! - /health/live - Process alive check
//! - /health/ready - Storage connectivity check
//! - /health/cache - Table cache counters
//!
//! No identity required for health endpoints.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use danesh_core::{overall_status, ComponentHealth, HealthStatus};
use danesh_storage::CacheStats;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub components: Vec<ComponentHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<u64>,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health/ping
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

/// GET /health/live
pub async fn liveness() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("Process is alive".to_string()),
        components: Vec::new(),
        version: None,
        uptime_seconds: None,
    };
    (StatusCode::OK, Json(response))
}

/// GET /health/ready
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.registry.store();
    let components = vec![check_storage(&state).await, cache_component(store.cache_stats())];
    let status = overall_status(&components);

    let response = HealthResponse {
        status,
        message: None,
        components,
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
        uptime_seconds: Some(state.start_time.elapsed().as_secs()),
    };

    let status_code = if status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status_code, Json(response))
}

/// GET /health/cache
pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.registry.store().cache_stats())
}

async fn check_storage(state: &AppState) -> ComponentHealth {
    let store = state.registry.store();
    let start = std::time::Instant::now();
    match store.ping().await {
        Ok(()) => ComponentHealth::healthy("storage")
            .with_latency(start.elapsed().as_millis() as i64)
            .with_detail("backend", json!(store.backend_name())),
        Err(e) => {
            tracing::warn!(error = %e, "storage readiness check failed");
            ComponentHealth::unhealthy("storage", e.to_string())
                .with_detail("backend", json!(store.backend_name()))
        }
    }
}

fn cache_component(stats: CacheStats) -> ComponentHealth {
    ComponentHealth::healthy("table_cache")
        .with_detail("entries", json!(stats.entry_count))
        .with_detail("hit_rate", json!(stats.hit_rate()))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create health check router (no identity required)
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
        .route("/cache", get(cache_stats))
}
