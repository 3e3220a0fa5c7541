//! Convenience re-exports for common use.

pub use crate::agent::{QueryOutcome, QueryResult, SqlAgent, SqlAgentConfig};
pub use crate::config::{AgentSettings, Text2SqlConfig};
pub use crate::database::{SqlDatabase, SqliteDatabase};
pub use crate::error::{Result, Text2SqlError};
pub use crate::models::LanguageModel;
pub use crate::provider::ModelProvider;
pub use crate::tools::{AgentTool, AgentToolParameters, Tool, ToolArguments};
pub use crate::types::{ContentPart, GenerationSettings, ModelMessage, Role, Usage};
