use studio_engine::pool::DEFAULT_MAX_CONCURRENT_CALLS;
use studio_engine::ProviderKind;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
#[error("invalid {key}={value:?}: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Normalized: empty, or a leading `/` without a trailing one.
    pub api_prefix: String,
    pub api_title: String,
    pub api_version: String,
    pub cors_origins: Vec<String>,
    pub max_upload_bytes: usize,
    pub provider: ProviderKind,
    pub max_concurrent_calls: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            api_prefix: "/api".to_string(),
            api_title: "AI Studio API".to_string(),
            api_version: "1.0.0".to_string(),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:3001".to_string(),
            ],
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            provider: ProviderKind::Gemini,
            max_concurrent_calls: DEFAULT_MAX_CONCURRENT_CALLS,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                                          |
    /// |-------------------------------|--------------------------------------------------|
    /// | `HOST`                        | `0.0.0.0`                                        |
    /// | `PORT`                        | `8000`                                           |
    /// | `API_PREFIX`                  | `/api`                                           |
    /// | `API_TITLE`                   | `AI Studio API`                                  |
    /// | `API_VERSION`                 | `1.0.0`                                          |
    /// | `CORS_ORIGINS`                | `http://localhost:3000,http://localhost:3001`    |
    /// | `MAX_UPLOAD_BYTES`            | `20971520`                                       |
    /// | `STUDIO_PROVIDER`             | `gemini`                                         |
    /// | `STUDIO_MAX_CONCURRENT_CALLS` | `8`                                              |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port: u16 = match var("PORT") {
            Some(raw) => parse_number("PORT", &raw)?,
            None => defaults.port,
        };
        let max_upload_bytes: usize = match var("MAX_UPLOAD_BYTES") {
            Some(raw) => parse_number("MAX_UPLOAD_BYTES", &raw)?,
            None => defaults.max_upload_bytes,
        };
        let max_concurrent_calls: usize = match var("STUDIO_MAX_CONCURRENT_CALLS") {
            Some(raw) => parse_number("STUDIO_MAX_CONCURRENT_CALLS", &raw)?,
            None => defaults.max_concurrent_calls,
        };
        if max_concurrent_calls == 0 {
            return Err(ConfigError {
                key: "STUDIO_MAX_CONCURRENT_CALLS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        let provider = match var("STUDIO_PROVIDER") {
            Some(raw) => raw.parse::<ProviderKind>().map_err(|reason| ConfigError {
                key: "STUDIO_PROVIDER",
                value: raw.clone(),
                reason,
            })?,
            None => defaults.provider,
        };
        let cors_origins = match var("CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.cors_origins,
        };

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port,
            api_prefix: lookup("API_PREFIX")
                .map(|raw| normalize_prefix(&raw))
                .unwrap_or(defaults.api_prefix),
            api_title: var("API_TITLE").unwrap_or(defaults.api_title),
            api_version: var("API_VERSION").unwrap_or(defaults.api_version),
            cors_origins,
            max_upload_bytes,
            provider,
            max_concurrent_calls,
        })
    }
}

fn parse_number<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|err: T::Err| ConfigError {
        key,
        value: raw.to_string(),
        reason: err.to_string(),
    })
}

/// `api/` → `/api`, `/` → `` (routes mounted at the root).
fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
