use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Represents a Groq-hosted model identifier.
///
/// This can be a predefined model or a custom string value for models that
/// the provider adds later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Model {
    /// Known model identifiers
    Known(KnownModel),

    /// Custom model identifier (for newly released or private models)
    Custom(String),
}

/// Known chat models served by Groq.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownModel {
    /// Llama 3.1 8B, the low-latency default.
    #[serde(rename = "llama-3.1-8b-instant")]
    Llama31_8bInstant,

    /// Llama 3.3 70B.
    #[serde(rename = "llama-3.3-70b-versatile")]
    Llama33_70bVersatile,

    /// Llama 3 8B with an 8k context window.
    #[serde(rename = "llama3-8b-8192")]
    Llama3_8b8192,

    /// Gemma 2 9B instruction-tuned.
    #[serde(rename = "gemma2-9b-it")]
    Gemma2_9bIt,
}

impl KnownModel {
    const ALL: [KnownModel; 4] = [
        KnownModel::Llama31_8bInstant,
        KnownModel::Llama33_70bVersatile,
        KnownModel::Llama3_8b8192,
        KnownModel::Gemma2_9bIt,
    ];

    /// The identifier sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            KnownModel::Llama31_8bInstant => "llama-3.1-8b-instant",
            KnownModel::Llama33_70bVersatile => "llama-3.3-70b-versatile",
            KnownModel::Llama3_8b8192 => "llama3-8b-8192",
            KnownModel::Gemma2_9bIt => "gemma2-9b-it",
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::Known(KnownModel::Llama31_8bInstant)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Model::Known(known_model) => write!(f, "{known_model}"),
            Model::Custom(custom) => write!(f, "{custom}"),
        }
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KnownModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KnownModel::ALL
            .into_iter()
            .find(|model| model.as_str() == s)
            .ok_or_else(|| format!("unknown model: {s}"))
    }
}

impl FromStr for Model {
    type Err = String;

    /// Parses a known model, falling back to `Model::Custom` for anything else.
    ///
    /// Only the empty string is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("model identifier must not be empty".to_string());
        }
        Ok(s.parse::<KnownModel>()
            .map(Model::Known)
            .unwrap_or_else(|_| Model::Custom(s.to_string())))
    }
}

impl From<KnownModel> for Model {
    fn from(model: KnownModel) -> Self {
        Model::Known(model)
    }
}

impl From<String> for Model {
    fn from(model: String) -> Self {
        Model::Custom(model)
    }
}

impl From<&str> for Model {
    fn from(model: &str) -> Self {
        Model::Custom(model.to_string())
    }
}
