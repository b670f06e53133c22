//! Tracing Subscriber Initialization
//!
//! Structured logs go to stdout, as JSON lines in production or
//! human-readable text locally. `RUST_LOG` overrides the default filter.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;
use crate::error::{ApiError, ApiResult};

const DEFAULT_FILTER: &str = "danesh_api=debug,danesh_storage=info,tower_http=debug,info";

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub environment: String,
    pub log_format: LogFormat,
}

impl TelemetryConfig {
    pub fn new(log_format: LogFormat) -> Self {
        Self {
            service_name: std::env::var("DANESH_SERVICE_NAME")
                .unwrap_or_else(|_| "danesh-api".to_string()),
            environment: std::env::var("DANESH_ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            log_format,
        }
    }
}

/// Install the global tracing subscriber. Call once at start-up.
pub fn init_tracer(config: &TelemetryConfig) -> ApiResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
    installed
        .map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = config.service_name,
        environment = config.environment,
        log_format = ?config.log_format,
        "Telemetry initialized"
    );
    Ok(())
}
