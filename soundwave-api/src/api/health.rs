//! Service root and health check endpoints

use axum::{routing::get, Json, Router};
use serde::Serialize;
use serde_json::{json, Value};

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

/// GET /health
///
/// Health check endpoint for monitoring. Does not require authentication.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "soundwave-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /
pub async fn service_root() -> Json<Value> {
    Json(json!({ "message": "Welcome to Soundwave" }))
}

/// Build root and health routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(service_root))
        .route("/health", get(health_check))
}
