use studio_contracts::models::Step;
use studio_contracts::InputError;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to decode image: {0}")]
    Decode(image::ImageError),
    #[error("failed to decode base64 image payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to encode PNG: {0}")]
    Encode(image::ImageError),
}

/// A single remote call that did not produce a usable response.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("{0} not set")]
    MissingApiKey(String),
    #[error("{provider} request failed ({endpoint}): {message}")]
    Transport {
        provider: String,
        endpoint: String,
        message: String,
    },
    #[error("{provider} request failed ({status}): {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },
    #[error("{provider} returned invalid JSON payload: {message}")]
    InvalidResponse { provider: String, message: String },
    #[error("{provider} inline data is not valid base64: {source}")]
    InlineData {
        provider: String,
        source: base64::DecodeError,
    },
    #[error("{provider} blocked the prompt: {reason}")]
    Blocked { provider: String, reason: String },
    #[error("{0}")]
    Provider(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] InputError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("{step} step failed: {source}")]
    Generation {
        step: Step,
        source: GenerationError,
    },
    #[error("Enhanced prompt not generated.")]
    Enhancement,
    #[error("Sketch image not generated.")]
    SketchGeneration,
    #[error("Rendered image not generated.")]
    RenderGeneration,
    #[error("worker task failed: {0}")]
    Worker(String),
}

impl PipelineError {
    pub fn is_validation(&self) -> bool {
        matches!(self, PipelineError::Validation(_))
    }
}
