use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use studio_contracts::models::{Step, StepModels};
use studio_contracts::{CustomPrompt, ResultEnvelope, RoomDescription};

use crate::client::{
    into_first_image, response_text, GenerateRequest, GenerationConfig, GenerativeClient,
    PromptPart, ResponsePart,
};
use crate::codec;
use crate::error::PipelineError;
use crate::pool::BlockingPool;
use crate::prompts;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Decoded output of the text flow, before anything is encoded.
#[derive(Debug, Clone)]
pub struct RoomGeneration {
    pub enhanced_prompt: String,
    pub sketch: DynamicImage,
    pub render: DynamicImage,
}

impl RoomGeneration {
    pub fn into_envelope(self, return_intermediates: bool) -> PipelineResult<ResultEnvelope> {
        let sketch = if return_intermediates {
            Some(codec::encode(&self.sketch)?)
        } else {
            None
        };
        Ok(ResultEnvelope {
            enhanced_prompt: Some(self.enhanced_prompt),
            sketch,
            render: codec::encode(&self.render)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SketchOutcome {
    /// Text the model sent alongside the image, if any.
    pub notes: Option<String>,
    pub sketch: DynamicImage,
}

/// Text → enhanced prompt → sketch → render, one remote call per step.
///
/// Holds no per-request state; one instance serves every request.
#[derive(Clone)]
pub struct RoomPipeline {
    client: Arc<dyn GenerativeClient>,
    models: StepModels,
    pool: BlockingPool,
}

impl RoomPipeline {
    pub fn new(client: Arc<dyn GenerativeClient>, models: StepModels, pool: BlockingPool) -> Self {
        Self {
            client,
            models,
            pool,
        }
    }

    pub fn models(&self) -> &StepModels {
        &self.models
    }

    pub fn client_name(&self) -> &str {
        self.client.name()
    }

    pub async fn generate_from_text(
        &self,
        description: &RoomDescription,
        return_intermediates: bool,
    ) -> PipelineResult<ResultEnvelope> {
        self.run_text(description)
            .await?
            .into_envelope(return_intermediates)
    }

    pub async fn generate_from_sketch(
        &self,
        sketch: &DynamicImage,
        custom_prompt: Option<&CustomPrompt>,
    ) -> PipelineResult<ResultEnvelope> {
        let render = self.render(sketch, custom_prompt).await?;
        Ok(ResultEnvelope::render_only(codec::encode(&render)?))
    }

    pub async fn run_text(&self, description: &RoomDescription) -> PipelineResult<RoomGeneration> {
        let enhanced_prompt = self.enhance(description).await?;
        let sketch = self.sketch(&enhanced_prompt).await?;
        let render = self.render(&sketch, None).await?;
        Ok(RoomGeneration {
            enhanced_prompt,
            sketch,
            render,
        })
    }

    pub async fn enhance(&self, description: &RoomDescription) -> PipelineResult<String> {
        let parts = vec![PromptPart::text(prompts::enhance_prompt(description.as_str()))];
        let response = self
            .call(Step::Enhance, parts, Some(GenerationConfig::no_thinking()))
            .await?;
        response_text(&response).ok_or(PipelineError::Enhancement)
    }

    pub async fn sketch(&self, enhanced_prompt: &str) -> PipelineResult<DynamicImage> {
        let parts = vec![PromptPart::text(prompts::sketch_prompt(enhanced_prompt))];
        let response = self.call(Step::Sketch, parts, None).await?;
        let image = into_first_image(response).ok_or(PipelineError::SketchGeneration)?;
        Ok(image.decode()?)
    }

    /// A custom prompt replaces the built-in instruction entirely.
    pub async fn render(
        &self,
        sketch: &DynamicImage,
        custom_prompt: Option<&CustomPrompt>,
    ) -> PipelineResult<DynamicImage> {
        let instruction = custom_prompt
            .map(|prompt| prompt.as_str().to_string())
            .unwrap_or_else(|| prompts::RENDER_INSTRUCTION.to_string());
        let parts = vec![PromptPart::Text(instruction), PromptPart::png(sketch)?];
        let response = self
            .call(Step::Render, parts, Some(GenerationConfig::deterministic()))
            .await?;
        let image = into_first_image(response).ok_or(PipelineError::RenderGeneration)?;
        Ok(image.decode()?)
    }

    /// Turns an existing picture into a pencil sketch with the step-2 model.
    pub async fn sketch_from_image(
        &self,
        image: &DynamicImage,
        instruction: Option<&str>,
    ) -> PipelineResult<SketchOutcome> {
        let instruction = instruction
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(prompts::SKETCHIFY_INSTRUCTION);
        let parts = vec![PromptPart::text(instruction), PromptPart::png(image)?];
        let response = self.call(Step::Sketch, parts, None).await?;
        let notes = response_text(&response);
        let sketch = into_first_image(response).ok_or(PipelineError::SketchGeneration)?;
        Ok(SketchOutcome {
            notes,
            sketch: sketch.decode()?,
        })
    }

    async fn call(
        &self,
        step: Step,
        parts: Vec<PromptPart>,
        config: Option<GenerationConfig>,
    ) -> PipelineResult<Vec<ResponsePart>> {
        let request = GenerateRequest {
            model: self.models.model(step).to_string(),
            parts,
            config,
        };
        let model = request.model.clone();
        let client = Arc::clone(&self.client);
        let started = Instant::now();
        tracing::info!(step = %step, model = %model, provider = client.name(), "remote call started");

        let outcome = self.pool.run(move || client.invoke(&request)).await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(parts) => {
                tracing::info!(step = %step, model = %model, elapsed_ms, parts = parts.len(), "remote call finished");
                Ok(parts)
            }
            Err(source) => {
                tracing::warn!(step = %step, model = %model, elapsed_ms, error = %source, "remote call failed");
                Err(PipelineError::Generation { step, source })
            }
        }
    }
}
