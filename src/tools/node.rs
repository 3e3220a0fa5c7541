//! Tool execution node: resolves every pending request of the latest
//! assistant message.
//!
//! Nothing that goes wrong inside a tool escapes this node. Unknown tool
//! names, panics and timeouts all turn into an error result the model can
//! read and react to.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use crate::agent::conversation::Conversation;
use crate::error::{Result, Text2SqlError};
use crate::tools::arguments::ToolArguments;
use crate::tools::tool::{Tool, ToolExecutionContext};
use crate::tools::types::ToolOutput;
use crate::types::{AgentToolCall, ModelMessage};
use crate::util::timeout::with_optional_timeout;

/// Executes tool calls against a fixed set of tools.
#[derive(Clone)]
pub struct ToolNode {
    tools: HashMap<String, Arc<dyn Tool>>,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for ToolNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ToolNode")
            .field("tools", &names)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ToolNode {
    pub fn new(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        Self {
            tools: tools
                .into_iter()
                .map(|tool| (tool.name().to_string(), tool))
                .collect(),
            timeout: None,
        }
    }

    /// Bound each tool invocation (`None` disables the bound).
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run every pending request, returning one tool-result message per
    /// request in request order.
    ///
    /// Fails only when the conversation has no pending request.
    pub async fn run(&self, conversation: &Conversation) -> Result<Vec<ModelMessage>> {
        let pending = conversation.pending_tool_calls();
        if pending.is_empty() {
            return Err(Text2SqlError::InvalidState(
                "tool node reached without pending tool requests".into(),
            ));
        }

        let mut results = Vec::with_capacity(pending.len());
        for call in pending {
            let output = self.run_call(call).await;
            results.push(ModelMessage::tool_result(
                call.id.clone(),
                output.text,
                output.is_error,
            ));
        }
        Ok(results)
    }

    /// Execute a single call, folding every failure into an error output.
    pub async fn run_call(&self, call: &AgentToolCall) -> ToolOutput {
        let Some(tool) = self.tools.get(&call.name) else {
            tracing::warn!(tool = %call.name, "model requested unknown tool");
            return fallback_output(format!("Tool '{}' is not available", call.name));
        };

        let args = ToolArguments::new(call.arguments.clone());
        let ctx = ToolExecutionContext {
            tool_call_id: Some(call.id.clone()),
            ..Default::default()
        };
        let guarded = std::panic::AssertUnwindSafe(tool.invoke(&args, &ctx)).catch_unwind();

        match with_optional_timeout(self.timeout, async { Ok(guarded.await) }).await {
            Ok(Ok(output)) => {
                tracing::debug!(tool = %call.name, is_error = output.is_error, "tool finished");
                output
            }
            Ok(Err(panic)) => {
                let message = panic_message(panic.as_ref());
                tracing::warn!(tool = %call.name, panic = %message, "tool panicked");
                fallback_output(message)
            }
            Err(err) => {
                tracing::warn!(tool = %call.name, error = %err, "tool did not finish");
                fallback_output(err)
            }
        }
    }
}

/// Error output used when a tool could not produce a result of its own.
pub fn fallback_output(fault: impl std::fmt::Display) -> ToolOutput {
    ToolOutput::error(format!("Error: {fault}\nplease fix your mistakes."))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked".to_string()
    }
}
