pub mod client;
pub mod codec;
pub mod dryrun;
pub mod error;
pub mod gemini;
pub mod pipeline;
pub mod pool;
pub mod prompts;

use std::sync::Arc;

pub use client::{
    GenerateRequest, GenerationConfig, GenerativeClient, InlineImage, PromptPart, ProviderKind,
    ResponsePart,
};
pub use error::{CodecError, GenerationError, PipelineError};
pub use pipeline::{RoomGeneration, RoomPipeline, SketchOutcome};
pub use pool::BlockingPool;

/// Builds the client for `kind`. Gemini settings come from the environment.
///
/// The returned client owns a blocking HTTP client; create it outside of any
/// async runtime.
pub fn client_from_env(kind: ProviderKind) -> Result<Arc<dyn GenerativeClient>, GenerationError> {
    match kind {
        ProviderKind::Gemini => {
            let config = gemini::GeminiConfig::from_env();
            if config.api_key.is_none() {
                tracing::warn!("no Gemini API key configured; every remote call will fail");
            }
            Ok(Arc::new(gemini::GeminiClient::new(config)?))
        }
        ProviderKind::Dryrun => Ok(Arc::new(dryrun::DryrunClient::new())),
    }
}
