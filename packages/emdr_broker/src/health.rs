use axum::{Json, extract::State, response::IntoResponse};

use crate::AppState;
use crate::metrics::HealthStatus;

/// Health check endpoint - returns broker status
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let metrics = state.broker.metrics().snapshot();
    Json(HealthStatus {
        status: "healthy".to_string(),
        sessions: state.broker.session_count().await as u64,
        connections: metrics.connections.active,
        uptime_secs: metrics.uptime_secs,
    })
}

/// Metrics endpoint - returns detailed broker metrics
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.broker.metrics().snapshot())
}

/// Liveness check - returns 200 if the server is running
pub async fn health_live_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "alive" }))
}
