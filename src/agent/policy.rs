//! Control-flow policy: what the latest generation output means.
//!
//! The model signals its intent through a text prefix. [`decide`] turns that
//! convention into a [`Decision`] so the state machine never matches on raw
//! strings.

use serde::{Deserialize, Serialize};

use crate::util::sql::contains_sql;

const ANSWER_PREFIX: &str = "Answer:";
const ERROR_PREFIX: &str = "Error:";

/// Interpretation of one generation output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, strum::IntoStaticStr)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Decision {
    /// Final answer, prefix stripped and trimmed. Ends the run.
    Final(String),
    /// The model reported a failure. Generation runs again.
    Retryable(String),
    /// Anything else is treated as a candidate query to check.
    Continue,
    /// Text with no SQL statement anywhere in it. Ends the run.
    ///
    /// Usually a question back to the user. An interpretation of executed
    /// results written without the `Answer:` prefix lands here too, so callers
    /// should read [`QueryResult::clarification`] when `answer` is `None`.
    ///
    /// [`QueryResult::clarification`]: crate::agent::QueryResult::clarification
    Clarify(String),
}

impl Decision {
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Final(_) | Self::Clarify(_))
    }
}

/// Policy settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub terminate_on_clarification: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            terminate_on_clarification: true,
        }
    }
}

impl Policy {
    pub fn decide(&self, text: &str) -> Decision {
        let text = text.trim_start();
        if let Some(answer) = text.strip_prefix(ANSWER_PREFIX) {
            return Decision::Final(answer.trim().to_string());
        }
        if text.starts_with(ERROR_PREFIX) {
            return Decision::Retryable(text.trim_end().to_string());
        }
        if self.terminate_on_clarification && !text.trim().is_empty() && !contains_sql(text) {
            return Decision::Clarify(text.trim_end().to_string());
        }
        Decision::Continue
    }
}

/// [`Policy::decide`] with the default policy.
pub fn decide(text: &str) -> Decision {
    Policy::default().decide(text)
}
