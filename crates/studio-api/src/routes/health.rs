use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

pub const SERVICE_NAME: &str = "AI Studio API";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
    pub docs: &'static str,
}

/// GET {prefix}/health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
    })
}

/// GET /
async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: format!("{} by AdityoLab", state.config.api_title),
        version: state.config.api_version.clone(),
        docs: "/docs",
    })
}

/// Routes that stay at the root, outside the API prefix.
pub fn root_router() -> Router<AppState> {
    Router::new().route("/", get(root))
}
