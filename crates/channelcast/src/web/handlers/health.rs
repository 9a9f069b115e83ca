//! Health check handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::web::AppState;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let healthy = state.database.health_check().await;
    let status = if healthy { "healthy" } else { "unhealthy" };
    Json(json!({ "status": status, "timestamp": chrono::Utc::now() }))
}

pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    if state.database.health_check().await {
        (StatusCode::OK, Json(json!({ "status": "ready" }))).into_response()
    } else {
        StatusCode::SERVICE_UNAVAILABLE.into_response()
    }
}

pub async fn liveness_check() -> impl IntoResponse {
    Json(json!({ "status": "alive" }))
}
