use serde::{Deserialize, Serialize};

/// Result of one pipeline invocation, images already encoded as base64 PNG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhanced_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sketch: Option<String>,
    pub render: String,
}

impl ResultEnvelope {
    pub fn render_only(render: String) -> Self {
        Self {
            enhanced_prompt: None,
            sketch: None,
            render,
        }
    }
}
