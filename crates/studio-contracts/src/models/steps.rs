use std::fmt;

use super::registry::{ModelRegistry, CAPABILITY_EDIT, CAPABILITY_IMAGE, CAPABILITY_TEXT};

pub const DEFAULT_MODEL_STEP1: &str = "gemini-2.0-flash-lite";
pub const DEFAULT_MODEL_STEP2: &str = "gemini-2.5-flash-image";
pub const DEFAULT_MODEL_STEP3: &str = "gemini-3-pro-image-preview";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Enhance,
    Sketch,
    Render,
}

impl Step {
    pub const ALL: [Step; 3] = [Step::Enhance, Step::Sketch, Step::Render];

    /// `step1`, `step2`, `step3`: the tag used in artifact names and events.
    pub fn tag(self) -> &'static str {
        match self {
            Step::Enhance => "step1",
            Step::Sketch => "step2",
            Step::Render => "step3",
        }
    }

    pub fn env_key(self) -> &'static str {
        match self {
            Step::Enhance => "MODEL_STEP1",
            Step::Sketch => "MODEL_STEP2",
            Step::Render => "MODEL_STEP3",
        }
    }

    pub fn capability(self) -> &'static str {
        match self {
            Step::Enhance => CAPABILITY_TEXT,
            Step::Sketch => CAPABILITY_IMAGE,
            Step::Render => CAPABILITY_EDIT,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Step::Enhance => "enhance",
            Step::Sketch => "sketch",
            Step::Render => "render",
        };
        f.write_str(label)
    }
}

/// Which remote model serves each pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepModels {
    pub step1: String,
    pub step2: String,
    pub step3: String,
}

impl Default for StepModels {
    fn default() -> Self {
        Self {
            step1: DEFAULT_MODEL_STEP1.to_string(),
            step2: DEFAULT_MODEL_STEP2.to_string(),
            step3: DEFAULT_MODEL_STEP3.to_string(),
        }
    }
}

impl StepModels {
    pub fn dryrun() -> Self {
        Self {
            step1: "dryrun-text-1".to_string(),
            step2: "dryrun-image-1".to_string(),
            step3: "dryrun-image-1".to_string(),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Blank values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let pick = |step: Step, fallback: String| {
            lookup(step.env_key())
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or(fallback)
        };
        Self {
            step1: pick(Step::Enhance, defaults.step1),
            step2: pick(Step::Sketch, defaults.step2),
            step3: pick(Step::Render, defaults.step3),
        }
    }

    pub fn model(&self, step: Step) -> &str {
        match step {
            Step::Enhance => &self.step1,
            Step::Sketch => &self.step2,
            Step::Render => &self.step3,
        }
    }

    /// Unknown models are allowed through so newly released names work
    /// without a registry update; they only produce a warning.
    pub fn check(&self, registry: &ModelRegistry) -> Vec<String> {
        let mut warnings = Vec::new();
        for step in Step::ALL {
            let name = self.model(step);
            match registry.get(name) {
                None => warnings.push(format!(
                    "Model '{name}' for {} is not in the registry; capability '{}' unverified.",
                    step.tag(),
                    step.capability()
                )),
                Some(known) if !known.supports(step.capability()) => warnings.push(format!(
                    "Model '{name}' for {} does not advertise capability '{}'.",
                    step.tag(),
                    step.capability()
                )),
                Some(_) => {}
            }
        }
        warnings
    }
}
