use std::env;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Map, Value};

use crate::client::{
    GenerateRequest, GenerationConfig, GenerativeClient, InlineImage, PromptPart, ResponsePart,
};
use crate::codec::PNG_MIME;
use crate::error::GenerationError;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

const PROVIDER: &str = "Gemini";
const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

#[derive(Clone)]
pub struct GeminiConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl GeminiConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// | var                            | default                          |
    /// |--------------------------------|----------------------------------|
    /// | `GEMINI_API_KEY`/`GOOGLE_API_KEY` | none (checked per call)       |
    /// | `GEMINI_API_BASE`              | `DEFAULT_API_BASE`               |
    /// | `GEMINI_REQUEST_TIMEOUT_SECS`  | `300`                            |
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let api_base = non_empty("GEMINI_API_BASE")
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let api_key = API_KEY_VARS.iter().find_map(|key| non_empty(key));
        let request_timeout = non_empty("GEMINI_REQUEST_TIMEOUT_SECS")
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS));
        Self {
            api_base,
            api_key,
            request_timeout,
        }
    }
}

/// Blocking client for the Gemini `generateContent` REST endpoint.
pub struct GeminiClient {
    config: GeminiConfig,
    http: HttpClient,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, GenerationError> {
        let http = HttpClient::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| GenerationError::Provider(format!("{PROVIDER} client setup failed: {err}")))?;
        Ok(Self { config, http })
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.config.api_base, model_path)
    }

    fn build_payload(request: &GenerateRequest) -> Value {
        let parts: Vec<Value> = request
            .parts
            .iter()
            .map(|part| match part {
                PromptPart::Text(text) => json!({ "text": text }),
                PromptPart::Image(image) => json!({
                    "inlineData": {
                        "mimeType": image.mime_type,
                        "data": BASE64.encode(&image.data),
                    }
                }),
            })
            .collect();

        let mut payload = Map::new();
        payload.insert(
            "contents".to_string(),
            json!([{ "role": "user", "parts": parts }]),
        );
        if let Some(config) = request.config.filter(|config| !config.is_empty()) {
            payload.insert(
                "generationConfig".to_string(),
                Value::Object(Self::generation_config(&config)),
            );
        }
        Value::Object(payload)
    }

    fn generation_config(config: &GenerationConfig) -> Map<String, Value> {
        let mut out = Map::new();
        if let Some(temperature) = config.temperature {
            out.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(top_p) = config.top_p {
            out.insert("topP".to_string(), json!(top_p));
        }
        if let Some(top_k) = config.top_k {
            out.insert("topK".to_string(), json!(top_k));
        }
        if let Some(budget) = config.thinking_budget {
            out.insert(
                "thinkingConfig".to_string(),
                json!({ "thinkingBudget": budget }),
            );
        }
        out
    }

    /// Parts of the first candidate, in order. Thought parts are not part of
    /// the answer and come back as `Other`.
    fn extract_parts(response_payload: &Value) -> Result<Vec<ResponsePart>, GenerationError> {
        let candidates = response_payload
            .get("candidates")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let Some(candidate) = candidates.first() else {
            if let Some(reason) = response_payload
                .get("promptFeedback")
                .and_then(|feedback| feedback.get("blockReason"))
                .and_then(Value::as_str)
            {
                return Err(GenerationError::Blocked {
                    provider: PROVIDER.to_string(),
                    reason: reason.to_string(),
                });
            }
            return Ok(Vec::new());
        };

        let parts = candidate
            .get("content")
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut out = Vec::with_capacity(parts.len());
        for part in parts {
            if part.get("thought").and_then(Value::as_bool) == Some(true) {
                out.push(ResponsePart::Other);
                continue;
            }
            let inline = part
                .get("inlineData")
                .or_else(|| part.get("inline_data"))
                .and_then(Value::as_object);
            if let Some(inline) = inline {
                let data = inline
                    .get("data")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                if data.is_empty() {
                    out.push(ResponsePart::Other);
                    continue;
                }
                let bytes =
                    BASE64
                        .decode(data.as_bytes())
                        .map_err(|source| GenerationError::InlineData {
                            provider: PROVIDER.to_string(),
                            source,
                        })?;
                let mime_type = inline
                    .get("mimeType")
                    .or_else(|| inline.get("mime_type"))
                    .and_then(Value::as_str)
                    .unwrap_or(PNG_MIME)
                    .to_string();
                out.push(ResponsePart::Image(InlineImage {
                    mime_type,
                    data: bytes,
                }));
                continue;
            }
            match part.get("text").and_then(Value::as_str) {
                Some(text) => out.push(ResponsePart::Text(text.to_string())),
                None => out.push(ResponsePart::Other),
            }
        }
        Ok(out)
    }
}

impl GenerativeClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn invoke(&self, request: &GenerateRequest) -> Result<Vec<ResponsePart>, GenerationError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(GenerationError::MissingApiKey(API_KEY_VARS.join(" or ")));
        };
        let endpoint = self.endpoint_for_model(&request.model);
        let payload = Self::build_payload(request);

        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", api_key)])
            .json(&payload)
            .send()
            .map_err(|err| GenerationError::Transport {
                provider: PROVIDER.to_string(),
                endpoint: endpoint.clone(),
                message: err.to_string(),
            })?;
        let response_payload = response_json_or_error(response)?;
        Self::extract_parts(&response_payload)
    }
}

fn response_json_or_error(response: HttpResponse) -> Result<Value, GenerationError> {
    let status = response.status();
    let body = response.text().map_err(|err| GenerationError::InvalidResponse {
        provider: PROVIDER.to_string(),
        message: format!("response body read failed: {err}"),
    })?;
    if !status.is_success() {
        return Err(GenerationError::Status {
            provider: PROVIDER.to_string(),
            status: status.as_u16(),
            body: truncate_text(&error_message_or_body(&body), 512),
        });
    }
    serde_json::from_str(&body).map_err(|err| GenerationError::InvalidResponse {
        provider: PROVIDER.to_string(),
        message: err.to_string(),
    })
}

/// Google error bodies carry a readable `error.message`; prefer it.
fn error_message_or_body(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|error| error.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
