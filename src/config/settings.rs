//! Agent run settings, loadable from TOML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::error::{Result, Text2SqlError};
use crate::models::{LanguageModel, DEFAULT_MODEL};
use crate::types::GenerationSettings;

const DEFAULT_MAX_STEPS: usize = 25;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Settings for one agent.
///
/// ```toml
/// model = "groq:llama3-70b-8192"
/// max_steps = 25
/// terminate_on_clarification = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[serde(default)]
pub struct AgentSettings {
    /// Model in `provider:model_id` form.
    #[builder(default = DEFAULT_MODEL.to_string(), into)]
    pub model: String,
    /// Node executions allowed per query before giving up.
    #[builder(default = DEFAULT_MAX_STEPS)]
    pub max_steps: usize,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    /// End the run when the model asks for clarification instead of writing SQL.
    #[builder(default = true)]
    pub terminate_on_clarification: bool,
    /// Per-invocation tool bound; unset means no bound.
    pub tool_timeout_ms: Option<u64>,
    /// Attempts per gateway call, including the first.
    #[builder(default = DEFAULT_RETRY_ATTEMPTS)]
    pub retry_attempts: u32,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl AgentSettings {
    /// Parse settings from TOML; missing keys take their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let settings: Self = toml::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Text2SqlError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), "loading agent settings");
        Self::from_toml_str(&raw)
    }

    /// Settings from the default file (if it exists) plus env overrides.
    pub fn load_default() -> Result<Self> {
        let settings = match default_config_path() {
            Some(path) if path.exists() => Self::load(path)?,
            _ => Self::default(),
        };
        settings.with_env_overrides()
    }

    /// Apply `TEXT2SQL_MODEL` and `TEXT2SQL_MAX_STEPS` from the environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(model) = lookup("TEXT2SQL_MODEL").filter(|v| !v.trim().is_empty()) {
            self.model = model.trim().to_string();
        }
        if let Some(raw) = lookup("TEXT2SQL_MAX_STEPS") {
            self.max_steps = raw.trim().parse().map_err(|_| {
                Text2SqlError::Configuration(format!("TEXT2SQL_MAX_STEPS is not a number: {raw}"))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// The configured model, parsed.
    pub fn language_model(&self) -> Result<LanguageModel> {
        self.model.parse()
    }

    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            ..Default::default()
        }
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_ms.map(Duration::from_millis)
    }

    fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            return Err(Text2SqlError::Configuration(
                "max_steps must be at least 1".into(),
            ));
        }
        self.language_model()?;
        Ok(())
    }
}

/// `~/.text2sql/config.toml`, when a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    directories::UserDirs::new().map(|dirs| dirs.home_dir().join(".text2sql").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_groq_with_25_steps() {
        let settings = AgentSettings::default();
        assert_eq!(settings.model, "groq:llama3-70b-8192");
        assert_eq!(settings.max_steps, 25);
        assert!(settings.terminate_on_clarification);
        assert_eq!(settings.retry_attempts, 3);
        assert_eq!(settings.tool_timeout(), None);
    }

    #[test]
    fn toml_fills_missing_keys_with_defaults() {
        let settings = AgentSettings::from_toml_str(
            r#"
            model = "openai:gpt-4o-mini"
            max_steps = 10
            tool_timeout_ms = 5000
            "#,
        )
        .unwrap();
        assert_eq!(settings.model, "openai:gpt-4o-mini");
        assert_eq!(settings.max_steps, 10);
        assert_eq!(settings.tool_timeout(), Some(Duration::from_millis(5000)));
        assert!(settings.terminate_on_clarification);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(AgentSettings::from_toml_str("max_steps = 0").is_err());
        assert!(AgentSettings::from_toml_str("model = \"bogus:x\"").is_err());
        assert!(matches!(
            AgentSettings::from_toml_str("max_steps = \"many\""),
            Err(Text2SqlError::Configuration(_))
        ));
    }

    #[test]
    fn overrides_apply_on_top_of_file() {
        let settings = AgentSettings::builder()
            .max_steps(5)
            .build()
            .with_overrides_from(|name| match name {
                "TEXT2SQL_MODEL" => Some("openai:gpt-4o".into()),
                "TEXT2SQL_MAX_STEPS" => Some("12".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(settings.model, "openai:gpt-4o");
        assert_eq!(settings.max_steps, 12);

        let err = AgentSettings::default()
            .with_overrides_from(|name| (name == "TEXT2SQL_MAX_STEPS").then(|| "x".into()))
            .unwrap_err();
        assert!(err.to_string().contains("TEXT2SQL_MAX_STEPS"));
    }
}
