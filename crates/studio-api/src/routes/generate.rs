//! Generation endpoints: the full text flow, the sketch upload flow and one
//! endpoint per step.

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Multipart, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use studio_contracts::{CustomPrompt, ResultEnvelope, RoomDescription};
use studio_engine::{codec, PipelineError};

use crate::error::{AppError, AppResult};
use crate::response::Success;
use crate::routes::AppJson;
use crate::state::AppState;

const FILE_FIELD: &str = "file";
const CUSTOM_PROMPT_FIELD: &str = "custom_prompt";

fn default_return_intermediates() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default = "default_return_intermediates")]
    pub return_intermediates: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct SketchUploadParams {
    pub custom_prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EnhanceRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct EnhanceData {
    pub enhanced_prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct SketchRequest {
    pub enhanced_prompt: String,
}

#[derive(Debug, Serialize)]
pub struct SketchData {
    pub sketch: String,
}

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    /// Bare base64 or a `data:` URL.
    pub sketch: String,
    #[serde(default)]
    pub custom_prompt: Option<String>,
}

/// POST {prefix}/generate
///
/// Enhances the description, draws a sketch from it and renders the sketch.
pub async fn generate_room(
    State(state): State<AppState>,
    AppJson(request): AppJson<GenerateRequest>,
) -> AppResult<Json<Success<ResultEnvelope>>> {
    let description = RoomDescription::parse(request.prompt)?;
    let envelope = state
        .pipeline
        .generate_from_text(&description, request.return_intermediates)
        .await?;
    Ok(Json(Success::new(envelope)))
}

/// POST {prefix}/generate-from-sketch
///
/// Multipart upload with an image in `file`. `custom_prompt` may come as a
/// query parameter or a form field; the query parameter wins.
pub async fn generate_from_sketch(
    State(state): State<AppState>,
    query: Result<Query<SketchUploadParams>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<Success<ResultEnvelope>>> {
    let Query(params) = query?;
    let upload = read_sketch_upload(multipart?).await?;

    let custom_prompt = CustomPrompt::from_optional(
        params
            .custom_prompt
            .as_deref()
            .or(upload.custom_prompt.as_deref()),
    );
    let file = upload
        .file
        .ok_or_else(|| AppError::BadRequest(format!("Missing '{FILE_FIELD}' field")))?;
    tracing::debug!(bytes = file.len(), custom_prompt = custom_prompt.is_some(), "sketch uploaded");

    let sketch = codec::decode(&file).map_err(PipelineError::from)?;
    let envelope = state
        .pipeline
        .generate_from_sketch(&sketch, custom_prompt.as_ref())
        .await?;
    Ok(Json(Success::new(envelope)))
}

/// POST {prefix}/generate/enhance
pub async fn enhance(
    State(state): State<AppState>,
    AppJson(request): AppJson<EnhanceRequest>,
) -> AppResult<Json<Success<EnhanceData>>> {
    let description = RoomDescription::parse(request.prompt)?;
    let enhanced_prompt = state.pipeline.enhance(&description).await?;
    Ok(Json(Success::new(EnhanceData { enhanced_prompt })))
}

/// POST {prefix}/generate/sketch
pub async fn sketch(
    State(state): State<AppState>,
    AppJson(request): AppJson<SketchRequest>,
) -> AppResult<Json<Success<SketchData>>> {
    if request.enhanced_prompt.trim().is_empty() {
        return Err(AppError::BadRequest(
            "enhanced_prompt must not be empty".to_string(),
        ));
    }
    let sketch = state.pipeline.sketch(&request.enhanced_prompt).await?;
    let sketch = codec::encode(&sketch).map_err(PipelineError::from)?;
    Ok(Json(Success::new(SketchData { sketch })))
}

/// POST {prefix}/generate/render
pub async fn render(
    State(state): State<AppState>,
    AppJson(request): AppJson<RenderRequest>,
) -> AppResult<Json<Success<ResultEnvelope>>> {
    let custom_prompt = CustomPrompt::from_optional(request.custom_prompt.as_deref());
    let sketch = codec::decode_base64(&request.sketch)
        .map_err(|err| AppError::BadRequest(format!("Invalid sketch image: {err}")))?;
    let envelope = state
        .pipeline
        .generate_from_sketch(&sketch, custom_prompt.as_ref())
        .await?;
    Ok(Json(Success::new(envelope)))
}

#[derive(Debug, Default)]
struct SketchUpload {
    file: Option<Bytes>,
    custom_prompt: Option<String>,
}

/// Reads the multipart body. A `file` field whose content type is not
/// `image/*` is rejected before its bytes are read.
async fn read_sketch_upload(mut multipart: Multipart) -> AppResult<SketchUpload> {
    let mut upload = SketchUpload::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(FILE_FIELD) => {
                let is_image = field
                    .content_type()
                    .is_some_and(|content_type| content_type.starts_with("image/"));
                if !is_image {
                    return Err(AppError::BadRequest(
                        "File must be an image (PNG, JPEG, etc.)".to_string(),
                    ));
                }
                upload.file = Some(field.bytes().await?);
            }
            Some(CUSTOM_PROMPT_FIELD) => {
                upload.custom_prompt = Some(field.text().await?);
            }
            _ => {}
        }
    }
    Ok(upload)
}
