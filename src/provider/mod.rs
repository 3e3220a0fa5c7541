//! Language-model gateway: provider trait and implementations.

pub mod groq;
pub mod http;
pub mod openai;
pub mod openai_compatible;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Text2SqlConfig;
use crate::error::Text2SqlError;
use crate::models::LanguageModel;
use crate::tools::Tool;
use crate::types::{AgentToolCall, FinishReason, GenerationSettings, ModelMessage, Usage};

/// A request sent to a model provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderRequest {
    pub messages: Vec<ModelMessage>,
    pub settings: GenerationSettings,
    /// Tools bound for this call; `None` means free text only.
    pub tools: Option<Vec<ToolDefinition>>,
}

/// Tool definition sent to the provider API.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    pub fn from_tool(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.parameters().schema.clone(),
        }
    }
}

impl From<&Arc<dyn Tool>> for ToolDefinition {
    fn from(tool: &Arc<dyn Tool>) -> Self {
        Self::from_tool(tool.as_ref())
    }
}

/// Response from a provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderResponse {
    pub text: String,
    pub usage: Usage,
    pub tool_calls: Vec<AgentToolCall>,
    pub finish_reason: Option<FinishReason>,
}

impl ProviderResponse {
    /// The response as an assistant message.
    pub fn into_message(self) -> ModelMessage {
        if self.tool_calls.is_empty() {
            ModelMessage::assistant(self.text)
        } else {
            ModelMessage::assistant_with_tool_calls(self.text, self.tool_calls)
        }
    }
}

/// Core trait implemented by all model providers.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name (e.g., "openai", "groq").
    fn provider_name(&self) -> &str;
    /// The model ID this provider instance serves.
    fn model_id(&self) -> &str;

    /// Generate a single (non-streaming) completion.
    async fn generate_text(&self, request: &ProviderRequest)
        -> Result<ProviderResponse, Text2SqlError>;
}

/// Create a provider for the given model, using the provided config.
pub fn create_provider(
    model: &LanguageModel,
    config: &Text2SqlConfig,
) -> Result<Arc<dyn ModelProvider>, Text2SqlError> {
    let key = model.provider_key();
    let api_key = config.get_api_key(key.as_str());
    let base_url = config.get_base_url(key.as_str());

    match model {
        LanguageModel::OpenAi(m) => {
            let api_key = api_key.ok_or_else(|| {
                Text2SqlError::Authentication("Missing OPENAI_API_KEY".into())
            })?;
            Ok(Arc::new(openai::OpenAiProvider::new(
                m.clone(),
                api_key,
                base_url,
            )))
        }
        LanguageModel::Groq(m) => {
            let api_key = api_key
                .ok_or_else(|| Text2SqlError::Authentication("Missing GROQ_API_KEY".into()))?;
            Ok(Arc::new(groq::GroqProvider::new(m.clone(), api_key, base_url)))
        }
        LanguageModel::OpenAiCompatible(m) => {
            let base_url = base_url.ok_or_else(|| {
                Text2SqlError::Configuration("Missing OPENAI_COMPAT_BASE_URL".into())
            })?;
            Ok(Arc::new(openai_compatible::OpenAiCompatibleProvider::new(
                m.clone(),
                api_key,
                base_url,
            )))
        }
    }
}
