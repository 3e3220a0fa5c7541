//! The text-to-SQL agent: conversation state, steps, policy and the graph
//! that sequences them.

pub mod conversation;
pub mod events;
pub mod graph;
pub mod policy;
pub mod prompts;
pub mod runtime;
pub mod steps;

pub use conversation::Conversation;
pub use events::{RunEvent, RunEventPayload, RunEventSink, RunLifecycle};
pub use graph::Node;
pub use policy::{decide, Decision, Policy};
pub use prompts::Prompts;
pub use runtime::{QueryOutcome, QueryResult, SqlAgent, SqlAgentConfig, BUDGET_EXHAUSTED_ANSWER};
