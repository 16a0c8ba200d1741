use axum::{Json, response::IntoResponse};
use serde_json::json;

/// Service banner with the public endpoints.
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "status": "Voice bridge running",
        "endpoints": ["/incoming-call", "/media-stream"],
    }))
}

/// Liveness probe.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({"status": "healthy"}))
}
