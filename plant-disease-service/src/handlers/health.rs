use crate::services::labels::NUM_CLASSES;
use crate::services::render_metrics;
use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

pub const SERVICE_NAME: &str = "plant-disease-service";

/// Fixed banner. Says nothing about readiness; see [`readiness_check`].
pub async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Plant Disease Detection API is running!" }))
}

/// Liveness probe.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness probe: healthy only once the classifier can serve.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    if state.classifier.is_ready() {
        (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "model": state.classifier.name(),
                "classes": NUM_CLASSES
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not_ready" })),
        )
    }
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        render_metrics(),
    )
}
