//! danesh API server entry point

use std::net::SocketAddr;
use std::sync::Arc;

use danesh_api::telemetry::{init_tracer, TelemetryConfig};
use danesh_api::{
    build_state, create_api_router, ApiConfig, ApiError, ApiResult, DbConfig, PgBackend,
    StorageKind,
};
use danesh_storage::{InMemoryBackend, StorageBackend};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let config = ApiConfig::from_env()?;
    init_tracer(&TelemetryConfig::new(config.log_format))?;

    let backend: Arc<dyn StorageBackend> = match config.storage {
        StorageKind::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Arc::new(InMemoryBackend::new())
        }
        StorageKind::Postgres => Arc::new(PgBackend::from_config(&DbConfig::from_env())?),
    };

    let state = build_state(config, backend).await?;
    let app = create_api_router(state);

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting danesh API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("DANESH_API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("DANESH_API_PORT").ok())
        .unwrap_or_else(|| "3000".to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
}
