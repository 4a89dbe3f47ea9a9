//! Health check handlers
//!
//! - `/health`: liveness, no dependencies checked
//! - `/ready`: store connectivity and ingestion status

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::ingest::IngestStatus;
use crate::server::AppState;

/// Overall health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Response for the basic health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

/// Individual component status
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub status: HealthStatus,
    /// Optional message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Response time in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
}

/// Response for the readiness endpoint
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: HealthStatus,
    pub database: ComponentStatus,
    pub ingestion: IngestStatus,
}

/// Basic health check endpoint.
///
/// Use this for Kubernetes liveness probes.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: HealthStatus::Healthy,
        service: "proof-gateway",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Readiness check endpoint.
///
/// Not ready while the store is unreachable or once ingestion has given
/// up restarting, so stale data is never served silently.
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let start = std::time::Instant::now();
    let database = match state.store.ping().await {
        Ok(()) => ComponentStatus {
            status: HealthStatus::Healthy,
            message: None,
            response_time_ms: Some(start.elapsed().as_millis() as u64),
        },
        Err(e) => ComponentStatus {
            status: HealthStatus::Unhealthy,
            message: Some(format!("Database unavailable: {}", e)),
            response_time_ms: Some(start.elapsed().as_millis() as u64),
        },
    };

    let ingestion = state.ingest.current();
    let ready = database.status == HealthStatus::Healthy && ingestion.healthy;

    let (code, status) = if ready {
        (StatusCode::OK, HealthStatus::Healthy)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, HealthStatus::Unhealthy)
    };

    (
        code,
        Json(ReadinessResponse {
            status,
            database,
            ingestion,
        }),
    )
}
