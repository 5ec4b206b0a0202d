use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};

pub const PROMPT_LABEL: &str = "step1_prompt";
pub const SKETCH_LABEL: &str = "step2_sketch";
pub const RENDER_LABEL: &str = "step3_render";
pub const SKETCHIFY_LABEL: &str = "sketch";

/// `20251205_152301`: sorts chronologically as plain text.
pub fn run_timestamp<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%Y%m%d_%H%M%S").to_string()
}

/// Model names go into file names, so anything outside `[A-Za-z0-9._-]`
/// becomes `-` and a REST-style `models/` prefix is dropped.
pub fn model_tag(model: &str) -> String {
    let trimmed = model.trim();
    let bare = trimmed.strip_prefix("models/").unwrap_or(trimmed);
    let tag: String = bare
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
                ch
            } else {
                '-'
            }
        })
        .collect();
    if tag.is_empty() {
        "unknown-model".to_string()
    } else {
        tag
    }
}

/// Names the files one terminal run leaves behind:
/// `{timestamp}_{model}_{label}.{ext}` inside the output directory.
#[derive(Debug, Clone)]
pub struct ArtifactNamer {
    dir: PathBuf,
    timestamp: String,
}

impl ArtifactNamer {
    pub fn new(dir: impl Into<PathBuf>, timestamp: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            timestamp: timestamp.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, model: &str, label: &str, ext: &str) -> PathBuf {
        self.dir.join(format!(
            "{}_{}_{}.{}",
            self.timestamp,
            model_tag(model),
            label,
            ext.trim_start_matches('.')
        ))
    }
}

pub fn write_text_artifact(path: &Path, text: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    Ok(())
}
