pub mod generate;
pub mod health;

use axum::extract::FromRequest;
use axum::routing::{get, post};
use axum::Router;

use crate::error::AppError;
use crate::state::AppState;

/// Build the route tree mounted under the configured API prefix.
///
/// ```text
/// POST /generate                   text → enhanced prompt → sketch → render
/// POST /generate/enhance           step 1 only
/// POST /generate/sketch            step 2 only
/// POST /generate/render            step 3 only, JSON body
/// POST /generate-from-sketch       step 3 only, multipart upload
/// GET  /health
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate::generate_room))
        .route("/generate/enhance", post(generate::enhance))
        .route("/generate/sketch", post(generate::sketch))
        .route("/generate/render", post(generate::render))
        .route("/generate-from-sketch", post(generate::generate_from_sketch))
        .route("/health", get(health::health_check))
}

/// `Json` whose rejections render as `AppError`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
