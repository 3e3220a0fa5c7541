//! Generic OpenAI-compatible provider (vLLM, Ollama, LM Studio, proxies).

use async_trait::async_trait;

use crate::error::Text2SqlError;

use super::openai::OpenAiProvider;
use super::{ModelProvider, ProviderRequest, ProviderResponse};

/// Generic provider for any OpenAI-compatible API.
pub struct OpenAiCompatibleProvider {
    inner: OpenAiProvider,
}

impl OpenAiCompatibleProvider {
    /// Local servers often need no key; `None` sends no `Authorization` header.
    pub fn new(model_id: impl Into<String>, api_key: Option<String>, base_url: String) -> Self {
        Self {
            inner: OpenAiProvider::new(model_id, api_key.unwrap_or_default(), Some(base_url))
                .with_provider_name("openai-compatible"),
        }
    }
}

#[async_trait]
impl ModelProvider for OpenAiCompatibleProvider {
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
