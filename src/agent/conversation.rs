//! Conversation state owned by a single agent run.
//!
//! The state only grows: [`Conversation::append`] returns a new value with one
//! more message and rejects any message that would break tool-call pairing.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::{Result, Text2SqlError};
use crate::types::{AgentToolCall, ModelMessage, Role};

/// Ordered message history plus the generation retry counter.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Conversation {
    messages: Vec<ModelMessage>,
    retry_count: u32,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// A conversation holding only the user's question.
    pub fn from_question(question: impl Into<String>) -> Self {
        Self {
            messages: vec![ModelMessage::user(question)],
            retry_count: 0,
        }
    }

    /// Return a new conversation with `message` appended.
    ///
    /// Fails with [`Text2SqlError::InvalidState`] when the message is a system
    /// prompt, a tool result that matches no outstanding request, or a user or
    /// assistant message sent while requests are still outstanding.
    pub fn append(&self, message: ModelMessage) -> Result<Conversation> {
        match message.role {
            Role::System => {
                return Err(Text2SqlError::InvalidState(
                    "system prompts are not part of the conversation".into(),
                ))
            }
            Role::Tool => {
                let result = message.tool_result_part().ok_or_else(|| {
                    Text2SqlError::InvalidState("tool message without a result".into())
                })?;
                let pending = self.pending_tool_calls();
                if !pending.iter().any(|call| call.id == result.tool_call_id) {
                    let reason = if self.is_resolved(&result.tool_call_id) {
                        "was already resolved"
                    } else {
                        "matches no pending request"
                    };
                    return Err(Text2SqlError::InvalidState(format!(
                        "tool result '{}' {reason}",
                        result.tool_call_id
                    )));
                }
            }
            Role::User | Role::Assistant => {
                let pending = self.pending_tool_calls();
                if !pending.is_empty() {
                    let ids: Vec<&str> = pending.iter().map(|call| call.id.as_str()).collect();
                    return Err(Text2SqlError::InvalidState(format!(
                        "{:?} message appended while tool requests are outstanding: {}",
                        message.role,
                        ids.join(", ")
                    )));
                }
            }
        }

        let mut messages = self.messages.clone();
        messages.push(message);
        Ok(Conversation {
            messages,
            retry_count: self.retry_count,
        })
    }

    /// Append several messages in order, stopping at the first rejection.
    pub fn append_all(&self, messages: impl IntoIterator<Item = ModelMessage>) -> Result<Conversation> {
        messages
            .into_iter()
            .try_fold(self.clone(), |conversation, message| conversation.append(message))
    }

    /// Same conversation with the retry counter incremented.
    pub fn with_retry(&self) -> Conversation {
        Conversation {
            messages: self.messages.clone(),
            retry_count: self.retry_count + 1,
        }
    }

    pub fn messages(&self) -> &[ModelMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ModelMessage> {
        self.messages.last()
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Requests of the latest assistant message that have no result yet.
    pub fn pending_tool_calls(&self) -> Vec<&AgentToolCall> {
        let Some(idx) = self
            .messages
            .iter()
            .rposition(|msg| msg.role == Role::Assistant)
        else {
            return Vec::new();
        };
        let resolved: HashSet<&str> = self.messages[idx + 1..]
            .iter()
            .filter_map(|msg| msg.tool_result_part())
            .map(|result| result.tool_call_id.as_str())
            .collect();
        self.messages[idx]
            .tool_calls()
            .into_iter()
            .filter(|call| !resolved.contains(call.id.as_str()))
            .collect()
    }

    fn is_resolved(&self, tool_call_id: &str) -> bool {
        self.messages
            .iter()
            .filter_map(|msg| msg.tool_result_part())
            .any(|result| result.tool_call_id == tool_call_id)
    }
}
