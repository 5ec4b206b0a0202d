use std::fmt;

pub const DESCRIPTION_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("{field} must be at most {max} characters (got {len})")]
    TooLong {
        field: &'static str,
        max: usize,
        len: usize,
    },
}

/// A short room description, the input of the text-to-render flow.
///
/// Length is counted in characters on the raw string, so multi-byte input
/// is not penalised. Whitespace-only input counts as empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomDescription(String);

impl RoomDescription {
    pub fn parse(raw: impl Into<String>) -> Result<Self, InputError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(InputError::Empty { field: "prompt" });
        }
        let len = raw.chars().count();
        if len > DESCRIPTION_MAX_CHARS {
            return Err(InputError::TooLong {
                field: "prompt",
                max: DESCRIPTION_MAX_CHARS,
                len,
            });
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

}

impl fmt::Display for RoomDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RoomDescription {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Caller-supplied render instruction that replaces the built-in one.
///
/// Any non-empty text is sent as is, whitespace and length included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomPrompt(String);

impl CustomPrompt {
    /// Only a missing or empty value falls back to the built-in instruction.
    pub fn from_optional(raw: Option<&str>) -> Option<Self> {
        raw.filter(|value| !value.is_empty())
            .map(|value| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CustomPrompt {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
