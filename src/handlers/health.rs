use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use utoipa::ToSchema;

use crate::AppState;

/// Component health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub version: String,
    pub database: ComponentStatus,
    pub database_latency_ms: u64,
    pub timestamp: String,
}

/// Readiness probe: the service is up and its database answers.
#[utoipa::path(
    get,
    path = "/health",
    summary = "Health check",
    responses(
        (status = 200, description = "Service and database are reachable", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse),
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let db_check_start = Instant::now();
    let db_result = crate::db::check_connection(&state.db).await;
    let latency = db_check_start.elapsed().as_millis() as u64;

    let (status_code, status) = if db_result.is_ok() {
        (StatusCode::OK, ComponentStatus::Up)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, ComponentStatus::Down)
    };

    let body = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: status,
        database_latency_ms: latency,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    (status_code, Json(body))
}
