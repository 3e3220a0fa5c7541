//! Model identifiers.
//!
//! Models are written `provider:model_id`, e.g. `groq:llama3-70b-8192` or
//! `openai:gpt-4o-mini`. A bare model id is taken to be a Groq model.

pub mod provider_key;

pub use provider_key::ProviderKey;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Text2SqlError;

/// Model used when nothing else is configured.
pub const DEFAULT_MODEL: &str = "groq:llama3-70b-8192";

/// A language model served by one of the supported gateways.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "provider", content = "model")]
pub enum LanguageModel {
    OpenAi(String),
    Groq(String),
    /// Any OpenAI-compatible server; the base URL comes from config.
    OpenAiCompatible(String),
}

impl LanguageModel {
    /// Get the model's API identifier string.
    pub fn model_id(&self) -> &str {
        match self {
            Self::OpenAi(m) | Self::Groq(m) | Self::OpenAiCompatible(m) => m,
        }
    }

    pub fn provider_key(&self) -> ProviderKey {
        match self {
            Self::OpenAi(_) => ProviderKey::OpenAi,
            Self::Groq(_) => ProviderKey::Groq,
            Self::OpenAiCompatible(_) => ProviderKey::OpenAiCompatible,
        }
    }

    /// Get the provider name.
    pub fn provider_name(&self) -> &str {
        self.provider_key().as_str()
    }
}

impl Default for LanguageModel {
    fn default() -> Self {
        Self::Groq("llama3-70b-8192".to_string())
    }
}

impl fmt::Display for LanguageModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider_name(), self.model_id())
    }
}

impl FromStr for LanguageModel {
    type Err = Text2SqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (provider, model_id) = match s.split_once(':') {
            Some((provider, model_id)) => (Some(provider), model_id.trim()),
            None => (None, s),
        };
        if model_id.is_empty() {
            return Err(Text2SqlError::ModelNotFound(format!(
                "missing model id in '{s}'"
            )));
        }
        let key = match provider {
            None => ProviderKey::Groq,
            Some(p) => ProviderKey::parse(p).ok_or_else(|| {
                Text2SqlError::ModelNotFound(format!("unknown provider '{p}' in '{s}'"))
            })?,
        };
        let model_id = model_id.to_string();
        Ok(match key {
            ProviderKey::OpenAi => Self::OpenAi(model_id),
            ProviderKey::Groq => Self::Groq(model_id),
            ProviderKey::OpenAiCompatible => Self::OpenAiCompatible(model_id),
        })
    }
}
