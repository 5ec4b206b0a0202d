use indexmap::IndexMap;

pub const CAPABILITY_TEXT: &str = "text";
pub const CAPABILITY_IMAGE: &str = "image";
pub const CAPABILITY_EDIT: &str = "edit";
pub const CAPABILITY_VISION: &str = "vision";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub provider: String,
    pub capabilities: Vec<String>,
}

impl ModelSpec {
    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|item| item == capability)
    }
}

/// Known models and what they can do. Lookups strip a leading `models/`
/// so names copied from the REST API resolve too.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelSpec>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ModelRegistry {
    pub fn new(models: Option<IndexMap<String, ModelSpec>>) -> Self {
        Self {
            models: models.unwrap_or_else(default_models),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        let trimmed = name.trim();
        let key = trimmed.strip_prefix("models/").unwrap_or(trimmed);
        self.models.get(key)
    }
}

fn default_models() -> IndexMap<String, ModelSpec> {
    let mut map = IndexMap::new();

    let mut insert = |name: &str, provider: &str, capabilities: &[&str]| {
        map.insert(
            name.to_string(),
            ModelSpec {
                name: name.to_string(),
                provider: provider.to_string(),
                capabilities: capabilities
                    .iter()
                    .map(|item| (*item).to_string())
                    .collect(),
            },
        );
    };

    insert("dryrun-text-1", "dryrun", &[CAPABILITY_TEXT]);
    insert("dryrun-image-1", "dryrun", &[CAPABILITY_IMAGE, CAPABILITY_EDIT]);
    insert("gemini-2.0-flash-lite", "gemini", &[CAPABILITY_TEXT]);
    insert("gemini-2.0-flash", "gemini", &[CAPABILITY_TEXT, CAPABILITY_VISION]);
    insert("gemini-2.5-flash", "gemini", &[CAPABILITY_TEXT, CAPABILITY_VISION]);
    insert("gemini-3-pro-preview", "gemini", &[CAPABILITY_TEXT, CAPABILITY_VISION]);
    insert("gemini-2.5-flash-image", "gemini", &[CAPABILITY_IMAGE, CAPABILITY_EDIT]);
    insert("gemini-2.5-flash-image-preview", "gemini", &[CAPABILITY_IMAGE, CAPABILITY_EDIT]);
    insert("gemini-3-pro-image-preview", "gemini", &[CAPABILITY_IMAGE, CAPABILITY_EDIT]);

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_accepts_rest_style_names() {
        let registry = ModelRegistry::default();
        let model = registry
            .get("models/gemini-2.5-flash-image")
            .expect("known model");
        assert_eq!(model.provider, "gemini");
        assert!(model.supports(CAPABILITY_EDIT));
    }

    #[test]
    fn unknown_models_are_absent() {
        let registry = ModelRegistry::default();
        assert!(registry.get("gpt-image-1").is_none());
        assert!(registry.get("  gemini-2.0-flash-lite ").is_some());
    }
}
