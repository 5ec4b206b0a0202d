#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::Value;
use tower::ServiceExt;

use studio_api::config::ServerConfig;
use studio_api::router::build_app_router;
use studio_api::state::AppState;
use studio_contracts::models::StepModels;
use studio_engine::{
    BlockingPool, GenerateRequest, GenerationError, GenerativeClient, InlineImage, ResponsePart,
    RoomPipeline,
};

pub const BOUNDARY: &str = "studio-test-boundary";

/// Replays canned responses in order and records every request it receives.
#[derive(Default)]
pub struct ScriptedClient {
    responses: Mutex<VecDeque<Result<Vec<ResponsePart>, GenerationError>>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedClient {
    pub fn new(responses: Vec<Result<Vec<ResponsePart>, GenerationError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl GenerativeClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    fn invoke(&self, request: &GenerateRequest) -> Result<Vec<ResponsePart>, GenerationError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Provider("script exhausted".to_string())))
    }
}

/// Always panics, to exercise panic recovery.
pub struct PanickingClient;

impl GenerativeClient for PanickingClient {
    fn name(&self) -> &str {
        "panicking"
    }

    fn invoke(&self, _request: &GenerateRequest) -> Result<Vec<ResponsePart>, GenerationError> {
        panic!("client exploded")
    }
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        ..ServerConfig::default()
    }
}

pub fn build_test_app(client: Arc<dyn GenerativeClient>) -> Router {
    build_test_app_with(client, test_config())
}

pub fn build_test_app_with(client: Arc<dyn GenerativeClient>, config: ServerConfig) -> Router {
    let pipeline = RoomPipeline::new(client, StepModels::default(), BlockingPool::new(2));
    build_app_router(AppState::new(pipeline, config))
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 200, 200])));
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

pub fn image_part(width: u32, height: u32) -> ResponsePart {
    ResponsePart::Image(InlineImage::png(png_bytes(width, height)))
}

pub fn text_part(text: &str) -> ResponsePart {
    ResponsePart::Text(text.to_string())
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    post_raw(app, uri, "application/json", body.to_string().into_bytes()).await
}

pub async fn post_raw(
    app: Router,
    uri: &str,
    content_type: &str,
    body: Vec<u8>,
) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// One multipart part: `(name, content type, bytes)`. A `None` content
/// type produces a plain form field.
pub type FormPart<'a> = (&'a str, Option<&'a str>, Vec<u8>);

pub fn multipart_body(parts: &[FormPart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, content_type, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match content_type {
            Some(content_type) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"upload\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
            }
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn post_multipart(app: Router, uri: &str, parts: &[FormPart<'_>]) -> Response<Body> {
    post_raw(
        app,
        uri,
        &format!("multipart/form-data; boundary={BOUNDARY}"),
        multipart_body(parts),
    )
    .await
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
