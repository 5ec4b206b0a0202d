use std::fmt;
use std::str::FromStr;

use image::DynamicImage;
use studio_contracts::models::StepModels;

use crate::codec;
use crate::error::{CodecError, GenerationError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl InlineImage {
    pub fn png(data: Vec<u8>) -> Self {
        Self {
            mime_type: codec::PNG_MIME.to_string(),
            data,
        }
    }

    pub fn decode(&self) -> Result<DynamicImage, CodecError> {
        codec::decode(&self.data)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPart {
    Text(String),
    Image(InlineImage),
}

impl PromptPart {
    pub fn text(text: impl Into<String>) -> Self {
        PromptPart::Text(text.into())
    }

    pub fn png(image: &DynamicImage) -> Result<Self, CodecError> {
        Ok(PromptPart::Image(InlineImage::png(codec::encode_png(image)?)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePart {
    Text(String),
    Image(InlineImage),
    /// Anything the pipeline has no use for (function calls, thoughts, ...).
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationConfig {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub top_k: Option<u32>,
    pub thinking_budget: Option<u32>,
}

impl GenerationConfig {
    /// Fastest mode for text models: no reasoning tokens.
    pub fn no_thinking() -> Self {
        Self {
            thinking_budget: Some(0),
            ..Self::default()
        }
    }

    pub fn deterministic() -> Self {
        Self {
            temperature: Some(0.0),
            top_p: Some(1.0),
            top_k: Some(40),
            thinking_budget: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.top_p.is_none()
            && self.top_k.is_none()
            && self.thinking_budget.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub parts: Vec<PromptPart>,
    pub config: Option<GenerationConfig>,
}

impl GenerateRequest {
    pub fn prompt_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                PromptPart::Text(text) => Some(text.as_str()),
                PromptPart::Image(_) => None,
            })
            .collect::<Vec<&str>>()
            .join("\n")
    }
}

/// One capability: send prompt parts to a named model and return the parts
/// of its answer. Implementations block the calling thread.
pub trait GenerativeClient: Send + Sync {
    fn name(&self) -> &str;
    fn invoke(&self, request: &GenerateRequest) -> Result<Vec<ResponsePart>, GenerationError>;
}

/// First image wins; later image parts are dropped on purpose.
pub fn first_image(parts: &[ResponsePart]) -> Option<&InlineImage> {
    parts.iter().find_map(|part| match part {
        ResponsePart::Image(image) => Some(image),
        _ => None,
    })
}

pub fn into_first_image(parts: Vec<ResponsePart>) -> Option<InlineImage> {
    parts.into_iter().find_map(|part| match part {
        ResponsePart::Image(image) => Some(image),
        _ => None,
    })
}

/// All text parts joined, surrounding whitespace trimmed.
pub fn response_text(parts: &[ResponsePart]) -> Option<String> {
    let joined: String = parts
        .iter()
        .filter_map(|part| match part {
            ResponsePart::Text(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    Dryrun,
}

impl ProviderKind {
    pub fn default_models(self) -> StepModels {
        match self {
            ProviderKind::Gemini => StepModels::default(),
            ProviderKind::Dryrun => StepModels::dryrun(),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "dryrun" | "dry-run" => Ok(ProviderKind::Dryrun),
            other => Err(format!(
                "unknown provider '{other}' (expected 'gemini' or 'dryrun')"
            )),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Gemini => f.write_str("gemini"),
            ProviderKind::Dryrun => f.write_str("dryrun"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(tag: u8) -> InlineImage {
        InlineImage::png(vec![tag])
    }

    #[test]
    fn first_image_skips_text_and_keeps_first_of_many() {
        let parts = vec![
            ResponsePart::Text("here you go".to_string()),
            ResponsePart::Other,
            ResponsePart::Image(image(1)),
            ResponsePart::Image(image(2)),
        ];
        assert_eq!(first_image(&parts), Some(&image(1)));
        assert_eq!(into_first_image(parts), Some(image(1)));
    }

    #[test]
    fn first_image_is_none_without_image_parts() {
        let parts = vec![ResponsePart::Text("no image".to_string())];
        assert!(first_image(&parts).is_none());
    }

    #[test]
    fn response_text_joins_and_trims() {
        let parts = vec![
            ResponsePart::Text("  A modern living room".to_string()),
            ResponsePart::Image(image(1)),
            ResponsePart::Text(" with oak floors.\n".to_string()),
        ];
        assert_eq!(
            response_text(&parts).as_deref(),
            Some("A modern living room with oak floors.")
        );
        assert_eq!(response_text(&[ResponsePart::Text("  ".to_string())]), None);
    }

    #[test]
    fn generation_config_presets() {
        let deterministic = GenerationConfig::deterministic();
        assert_eq!(deterministic.temperature, Some(0.0));
        assert_eq!(deterministic.top_p, Some(1.0));
        assert_eq!(deterministic.top_k, Some(40));
        assert_eq!(GenerationConfig::no_thinking().thinking_budget, Some(0));
        assert!(GenerationConfig::default().is_empty());
        assert!(!GenerationConfig::no_thinking().is_empty());
    }

    #[test]
    fn provider_kind_parses_aliases() {
        assert_eq!("Gemini".parse::<ProviderKind>(), Ok(ProviderKind::Gemini));
        assert_eq!(" dry-run ".parse::<ProviderKind>(), Ok(ProviderKind::Dryrun));
        assert!("openai".parse::<ProviderKind>().is_err());
        assert_eq!(ProviderKind::Dryrun.default_models(), StepModels::dryrun());
    }
}
