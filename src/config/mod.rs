//! Configuration system (layered: code > env).
//!
//! [`Text2SqlConfig`] holds gateway credentials and endpoints;
//! [`AgentSettings`] holds the knobs of an agent run.

pub mod settings;

pub use settings::AgentSettings;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::models::ProviderKey;

/// Layered gateway configuration.
///
/// Values set in code win over values read from the environment, since
/// [`from_env`](Self::from_env) only fills what it finds and setters overwrite.
#[derive(Clone, Default)]
pub struct Text2SqlConfig {
    api_keys: Arc<RwLock<HashMap<String, String>>>,
    base_urls: Arc<RwLock<HashMap<String, String>>>,
}

impl fmt::Debug for Text2SqlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let providers: Vec<String> = self
            .api_keys
            .read()
            .map(|keys| keys.keys().cloned().collect())
            .unwrap_or_default();
        f.debug_struct("Text2SqlConfig")
            .field("api_keys_for", &providers)
            .field("base_urls", &self.base_urls)
            .finish()
    }
}

impl Text2SqlConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from environment variables (`GROQ_API_KEY`, `OPENAI_API_KEY`, ...).
    ///
    /// A `.env` file in the working directory is read first when present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let config = Self::new();
        for key in ProviderKey::all() {
            let prefix = key.env_prefix();
            if let Some(api_key) = lookup(&format!("{prefix}_API_KEY")).filter(|v| !v.is_empty()) {
                config.set_api_key(key.as_str(), api_key);
            }
            if let Some(url) = lookup(&format!("{prefix}_BASE_URL")).filter(|v| !v.is_empty()) {
                config.set_base_url(key.as_str(), url);
            }
        }
        config
    }

    pub fn set_api_key(&self, provider: &str, key: impl Into<String>) {
        if let Ok(mut keys) = self.api_keys.write() {
            keys.insert(provider.to_string(), key.into());
        }
    }

    pub fn get_api_key(&self, provider: &str) -> Option<String> {
        self.api_keys.read().ok()?.get(provider).cloned()
    }

    pub fn set_base_url(&self, provider: &str, url: impl Into<String>) {
        if let Ok(mut urls) = self.base_urls.write() {
            urls.insert(provider.to_string(), url.into());
        }
    }

    pub fn get_base_url(&self, provider: &str) -> Option<String> {
        self.base_urls.read().ok()?.get(provider).cloned()
    }

    /// Check if a provider has an API key configured.
    pub fn has_credentials(&self, provider: &str) -> bool {
        self.get_api_key(provider).is_some()
    }
}
