//! Groq provider (OpenAI-compatible).

use async_trait::async_trait;

use crate::error::Text2SqlError;

use super::openai::OpenAiProvider;
use super::{ModelProvider, ProviderRequest, ProviderResponse};

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

pub struct GroqProvider {
    inner: OpenAiProvider,
}

impl GroqProvider {
    /// `base_url` overrides the public Groq endpoint (e.g. for a proxy).
    pub fn new(model_id: impl Into<String>, api_key: impl Into<String>, base_url: Option<String>) -> Self {
        Self {
            inner: OpenAiProvider::new(
                model_id,
                api_key,
                Some(base_url.unwrap_or_else(|| GROQ_BASE_URL.to_string())),
            )
            .with_provider_name("groq"),
        }
    }
}

#[async_trait]
impl ModelProvider for GroqProvider {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
    async fn generate_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderResponse, Text2SqlError> {
        self.inner.generate_text(request).await
    }
}
