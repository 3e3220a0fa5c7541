//! Tool trait and closure-based tool wrapper.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::arguments::ToolArguments;
use super::types::{AgentToolParameters, ToolOutput};
use crate::error::Text2SqlError;

/// Context available during tool execution.
#[derive(Debug, Clone, Default)]
pub struct ToolExecutionContext {
    /// Id of the tool call being served, when invoked by the agent.
    pub tool_call_id: Option<String>,
    /// Additional metadata for the tool.
    pub metadata: serde_json::Value,
}

/// Core tool trait. Implement to create custom tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the model calls).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON Schema parameters.
    fn parameters(&self) -> &AgentToolParameters;

    /// Execute the tool with parsed arguments.
    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<String, Text2SqlError>;

    /// Execute the tool and fold any failure into an error output.
    ///
    /// Never fails: callers always get text they can hand back to the model.
    async fn invoke(&self, args: &ToolArguments, ctx: &ToolExecutionContext) -> ToolOutput {
        match self.execute(args, ctx).await {
            Ok(text) => ToolOutput::ok(text),
            Err(err) => {
                tracing::debug!(tool = self.name(), error = %err, "tool returned error");
                ToolOutput::error(error_text(&err))
            }
        }
    }
}

/// Render an error the way the model expects to see it: prefixed with `Error:`.
pub(crate) fn error_text(err: &Text2SqlError) -> String {
    let message = match err {
        Text2SqlError::ToolExecution { message, .. } => message.clone(),
        Text2SqlError::Database(message) => message.clone(),
        other => other.to_string(),
    };
    if message.starts_with("Error:") {
        message
    } else {
        format!("Error: {message}")
    }
}

type ToolHandler =
    dyn Fn(ToolArguments, ToolExecutionContext) -> BoxFuture<'static, Result<String, Text2SqlError>>
        + Send
        + Sync;

/// Closure-based tool for quick tool creation.
pub struct AgentTool {
    name: String,
    description: String,
    parameters: AgentToolParameters,
    handler: Arc<ToolHandler>,
}

impl AgentTool {
    /// Create a tool from a closure.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: AgentToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, Text2SqlError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(move |args, ctx| Box::pin(handler(args, ctx))),
        }
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &AgentToolParameters {
        &self.parameters
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<String, Text2SqlError> {
        (self.handler)(args.clone(), ctx.clone()).await
    }
}

impl std::fmt::Debug for AgentTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}
