use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use sha2::{Digest, Sha256};

use crate::client::{GenerateRequest, GenerativeClient, InlineImage, PromptPart, ResponsePart};
use crate::codec;
use crate::error::GenerationError;

pub const DRYRUN_DEFAULT_SIZE: u32 = 512;
const DRYRUN_TEXT_MAX_CHARS: usize = 400;

/// Offline stand-in for a real provider.
///
/// Every call answers with one text part echoing the prompt and one solid
/// color PNG. The color is a hash of model and prompt, so reruns are stable;
/// the size follows the first input image, or 512x512 without one.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryrunClient;

impl DryrunClient {
    pub fn new() -> Self {
        Self
    }
}

impl GenerativeClient for DryrunClient {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn invoke(&self, request: &GenerateRequest) -> Result<Vec<ResponsePart>, GenerationError> {
        let prompt = request.prompt_text();
        let (width, height) = input_dimensions(request)?;
        let (r, g, b) = color_from_prompt(&request.model, &prompt);
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([r, g, b])));
        let png = codec::encode_png(&image)
            .map_err(|err| GenerationError::Provider(format!("dryrun render failed: {err}")))?;

        Ok(vec![
            ResponsePart::Text(format!(
                "[dryrun:{}] {}",
                request.model,
                truncate_text(prompt.trim(), DRYRUN_TEXT_MAX_CHARS)
            )),
            ResponsePart::Image(InlineImage::png(png)),
        ])
    }
}

fn input_dimensions(request: &GenerateRequest) -> Result<(u32, u32), GenerationError> {
    let first_input = request.parts.iter().find_map(|part| match part {
        PromptPart::Image(image) => Some(image),
        PromptPart::Text(_) => None,
    });
    match first_input {
        Some(image) => image
            .decode()
            .map(|decoded| decoded.dimensions())
            .map_err(|err| GenerationError::Provider(format!("dryrun input unreadable: {err}"))),
        None => Ok((DRYRUN_DEFAULT_SIZE, DRYRUN_DEFAULT_SIZE)),
    }
}

fn color_from_prompt(model: &str, prompt: &str) -> (u8, u8, u8) {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    hasher.update([0u8]);
    hasher.update(prompt.as_bytes());
    let digest = hasher.finalize();
    (digest[0], digest[1], digest[2])
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
