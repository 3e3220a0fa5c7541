//! Typed provider identifiers and alias handling.

/// Canonical provider keys used across model parsing, config, and provider wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKey {
    OpenAi,
    Groq,
    OpenAiCompatible,
}

impl ProviderKey {
    /// Canonical provider key string.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Groq => "groq",
            Self::OpenAiCompatible => "openai-compatible",
        }
    }

    /// Parse user-facing provider aliases into a typed provider key.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "groq" => Some(Self::Groq),
            "openai-compatible" | "openai_compatible" | "compatible" => {
                Some(Self::OpenAiCompatible)
            }
            _ => None,
        }
    }

    /// Prefix of the environment variables carrying this provider's settings.
    pub const fn env_prefix(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI",
            Self::Groq => "GROQ",
            Self::OpenAiCompatible => "OPENAI_COMPAT",
        }
    }

    pub const fn all() -> [Self; 3] {
        [Self::OpenAi, Self::Groq, Self::OpenAiCompatible]
    }
}
