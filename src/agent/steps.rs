//! The three model-driven steps of the graph.
//!
//! Each step sends a system prompt plus part of the conversation to the
//! gateway and returns one assistant message to append. Steps never touch
//! the database; tool requests they produce are run by a `ToolNode`.

use std::sync::Arc;

use crate::agent::conversation::Conversation;
use crate::error::{Result, Text2SqlError};
use crate::provider::{ModelProvider, ProviderRequest, ProviderResponse, ToolDefinition};
use crate::tools::sql::{GET_SCHEMA_TOOL, LIST_TABLES_TOOL, QUERY_TOOL};
use crate::tools::Tool;
use crate::types::{AgentToolCall, GenerationSettings, ModelMessage, Role, Usage};
use crate::util::retry::RetryPolicy;
use crate::util::sql::locate_sql;

/// Model access shared by all steps of one agent.
#[derive(Clone)]
pub struct Gateway {
    provider: Arc<dyn ModelProvider>,
    settings: GenerationSettings,
    retry: RetryPolicy,
}

impl Gateway {
    pub fn new(provider: Arc<dyn ModelProvider>, settings: GenerationSettings, retry: RetryPolicy) -> Self {
        Self {
            provider,
            settings,
            retry,
        }
    }

    pub fn provider(&self) -> &Arc<dyn ModelProvider> {
        &self.provider
    }

    /// One completion: `system` followed by `messages`, retrying transient errors.
    pub async fn complete(
        &self,
        system: &str,
        messages: &[ModelMessage],
        tools: Option<Vec<ToolDefinition>>,
    ) -> Result<ProviderResponse> {
        let mut all = Vec::with_capacity(messages.len() + 1);
        all.push(ModelMessage::system(system));
        all.extend(messages.iter().cloned());
        let request = ProviderRequest {
            messages: all,
            settings: self.settings.clone(),
            tools,
        };
        self.retry
            .execute(|| self.provider.generate_text(&request))
            .await
    }
}

/// Message produced by a step, with the tokens it cost.
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub message: ModelMessage,
    pub usage: Usage,
}

/// Ask the model which tables matter and request their schema.
///
/// When the model names no table, every table from the listing is requested.
pub async fn resolve_schema(
    gateway: &Gateway,
    prompt: &str,
    schema_tool: &dyn Tool,
    conversation: &Conversation,
) -> Result<StepOutput> {
    let response = gateway
        .complete(
            prompt,
            conversation.messages(),
            Some(vec![ToolDefinition::from_tool(schema_tool)]),
        )
        .await?;

    let mut calls = keep_calls(response.tool_calls, GET_SCHEMA_TOOL);
    if calls.is_empty() {
        let tables = latest_result_of(conversation, LIST_TABLES_TOOL).unwrap_or_default();
        tracing::warn!(tables = %tables, "model selected no tables, requesting all");
        calls.push(AgentToolCall::new(
            GET_SCHEMA_TOOL,
            serde_json::json!({ "table_names": tables }),
        ));
    }

    Ok(StepOutput {
        message: ModelMessage::assistant_with_tool_calls(response.text, calls),
        usage: response.usage,
    })
}

/// Free-text generation over the whole conversation. No tools are bound.
pub async fn generate_query(
    gateway: &Gateway,
    prompt: &str,
    conversation: &Conversation,
) -> Result<StepOutput> {
    let response = gateway.complete(prompt, conversation.messages(), None).await?;
    if !response.tool_calls.is_empty() {
        tracing::warn!(
            dropped = response.tool_calls.len(),
            "dropping tool requests from free-text generation"
        );
    }
    tracing::debug!(text = %response.text, "generated");
    Ok(StepOutput {
        message: ModelMessage::assistant(response.text),
        usage: response.usage,
    })
}

/// Review the latest candidate and request its execution.
///
/// Only the latest message is sent. Without a tool request in the reply, the
/// statement in the reply's text (or the unchanged candidate) is executed.
pub async fn check_query(
    gateway: &Gateway,
    prompt: &str,
    query_tool: &dyn Tool,
    conversation: &Conversation,
) -> Result<StepOutput> {
    let candidate = conversation
        .last()
        .filter(|msg| msg.role == Role::Assistant)
        .ok_or_else(|| {
            Text2SqlError::InvalidState("query check needs a candidate from generation".into())
        })?;

    let response = gateway
        .complete(
            prompt,
            std::slice::from_ref(candidate),
            Some(vec![ToolDefinition::from_tool(query_tool)]),
        )
        .await?;

    let mut calls = keep_calls(response.tool_calls, QUERY_TOOL);
    calls.truncate(1);
    if calls.is_empty() {
        let candidate_text = candidate.text();
        let query = locate_sql(&response.text)
            .or_else(|| locate_sql(&candidate_text))
            .unwrap_or_else(|| candidate_text.trim().to_string());
        tracing::warn!(query = %query, "checker made no tool request, executing candidate");
        calls.push(AgentToolCall::new(
            QUERY_TOOL,
            serde_json::json!({ "query": query }),
        ));
    }

    Ok(StepOutput {
        message: ModelMessage::assistant_with_tool_calls(response.text, calls),
        usage: response.usage,
    })
}

fn keep_calls(calls: Vec<AgentToolCall>, name: &str) -> Vec<AgentToolCall> {
    let total = calls.len();
    let kept: Vec<AgentToolCall> = calls.into_iter().filter(|call| call.name == name).collect();
    if kept.len() < total {
        tracing::warn!(
            expected = name,
            dropped = total - kept.len(),
            "dropping requests for tools not bound to this step"
        );
    }
    kept
}

/// Content of the latest successful result of `tool_name`.
fn latest_result_of(conversation: &Conversation, tool_name: &str) -> Option<String> {
    let messages = conversation.messages();
    messages.iter().rev().find_map(|msg| {
        let result = msg.tool_result_part()?;
        if result.is_error {
            return None;
        }
        let requested_by = messages
            .iter()
            .flat_map(|m| m.tool_calls())
            .find(|call| call.id == result.tool_call_id)?;
        (requested_by.name == tool_name).then(|| result.content.clone())
    })
}
