//! Oracle model identifiers
//!
//! Models are addressed by their provider id (e.g. `cohere.command-r-plus-08-2024`,
//! `xai.grok-4`). The id prefix decides the request shape the inference
//! endpoint expects, see [`ModelFamily`].

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default model for the thinking and decision passes.
pub const DEFAULT_REASONING_MODEL: &str = "cohere.command-r-plus-08-2024";

/// Default model for the parameter refinement pass.
pub const DEFAULT_REFINEMENT_MODEL: &str = "xai.grok-4";

/// Request-shape family of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFamily {
    /// Single free-text `message` field
    Cohere,
    /// Role-tagged `messages` list (Grok, Llama, OpenAI, ...)
    Generic,
}

impl ModelFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::Cohere => "COHERE",
            ModelFamily::Generic => "GENERIC",
        }
    }
}

/// Identifier of an oracle model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn reasoning_default() -> Self {
        Self::new(DEFAULT_REASONING_MODEL)
    }

    pub fn refinement_default() -> Self {
        Self::new(DEFAULT_REFINEMENT_MODEL)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Provider prefix (`cohere`, `xai`, `meta`, ...)
    pub fn vendor(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    pub fn family(&self) -> ModelFamily {
        if self.vendor().eq_ignore_ascii_case("cohere") {
            ModelFamily::Cohere
        } else {
            ModelFamily::Generic
        }
    }
}

impl Default for ModelId {
    fn default() -> Self {
        Self::reasoning_default()
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ModelId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidModel(
                "model id must not be empty".to_string(),
            ));
        }
        Ok(Self::new(trimmed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_from_prefix() {
        assert_eq!(
            ModelId::new("cohere.command-r-plus-08-2024").family(),
            ModelFamily::Cohere
        );
        assert_eq!(ModelId::new("xai.grok-4").family(), ModelFamily::Generic);
        assert_eq!(
            ModelId::new("meta.llama-4-scout-17b-16e-instruct").family(),
            ModelFamily::Generic
        );
    }

    #[test]
    fn test_vendor_without_dot() {
        assert_eq!(ModelId::new("local-model").vendor(), "local-model");
        assert_eq!(ModelId::new("local-model").family(), ModelFamily::Generic);
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!("  ".parse::<ModelId>().is_err());
        assert_eq!(
            " xai.grok-4 ".parse::<ModelId>().unwrap().as_str(),
            "xai.grok-4"
        );
    }
}
