//! Credit Scoring API Server
//!
//! HTTP surface over the client feature table and the scoring model.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::GovernorLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod service;

use crate::config::{LoggingConfig, ServiceConfig};
use crate::error::StartupError;
use crate::service::InferenceService;

/// Application state shared across handlers.
///
/// Built once at startup and never written afterwards, so handlers share it
/// through a plain `Arc` without locking.
pub struct AppState {
    /// Table and scorer
    pub service: InferenceService,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
    /// Prometheus render handle, when the recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new application state
    pub fn new(service: InferenceService) -> Self {
        Self {
            service,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
            metrics: None,
        }
    }

    /// Attach a Prometheus handle for `/metrics`
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub model: String,
    pub data: DataStatus,
}

/// Loaded data summary
#[derive(Debug, Serialize)]
pub struct DataStatus {
    pub client_count: usize,
    pub feature_count: usize,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/predict", post(routes::predictions::predict))
        .route("/predict_custom", post(routes::predictions::predict_custom))
        .route("/get_first", get(routes::clients::get_first))
        .route("/client/:client_id", get(routes::clients::get_client))
        .route("/column/:column_name", get(routes::columns::get_column))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        model: state.service.model_description(),
        data: DataStatus {
            client_count: state.service.client_count(),
            feature_count: state.service.feature_count(),
        },
    })
}

/// Prometheus exposition handler
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

/// Initialize logging; `RUST_LOG` overrides the configured level
pub fn init_logging(config: &LoggingConfig) -> Result<(), StartupError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| StartupError::Logging(e.to_string()))
}

/// Install the global Prometheus recorder
pub fn install_metrics() -> Result<PrometheusHandle, StartupError> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| StartupError::Metrics(e.to_string()))
}

/// Load artifacts and run the server until it stops
pub async fn run_server(config: ServiceConfig) -> Result<(), StartupError> {
    let service = InferenceService::load(&config)?;
    let mut state = AppState::new(service);
    if config.metrics.enabled {
        state = state.with_metrics(install_metrics()?);
    }

    let mut app = create_router(Arc::new(state));
    if config.rate_limit.enabled {
        let governor = rate_limit::create_governor_config(&config.rate_limit)?;
        app = app.layer(GovernorLayer { config: governor });
        info!(
            "Rate limiting: burst {}, one request replenished every {}s",
            config.rate_limit.burst_size, config.rate_limit.per_second
        );
    }

    info!("Starting API server on {}", config.server.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice_is_typed_error() {
        let config = LoggingConfig::default();
        let _ = init_logging(&config);
        assert!(matches!(init_logging(&config), Err(StartupError::Logging(_))));
    }
}
