use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use studio_contracts::InputError;
use studio_engine::PipelineError;

/// Application-level error type for HTTP handlers.
///
/// Every error renders as `{"detail": message}`. Client mistakes are 400;
/// anything that went wrong while generating is 500 with the message
/// prefixed by `Generation failed: `.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<InputError> for AppError {
    fn from(err: InputError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Pipeline(err) if err.is_validation() => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            AppError::Pipeline(err) => {
                tracing::error!(error = %err, "generation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Generation failed: {err}"),
                )
            }
        };

        (status, axum::Json(json!({ "detail": detail }))).into_response()
    }
}
