//! Tools the agent binds to the model, and the node that executes them.

pub mod arguments;
pub mod node;
pub mod sql;
pub mod tool;
pub mod types;

pub use arguments::ToolArguments;
pub use node::ToolNode;
pub use sql::{SqlToolkit, GET_SCHEMA_TOOL, LIST_TABLES_TOOL, QUERY_TOOL};
pub use tool::{AgentTool, Tool, ToolExecutionContext};
pub use types::{AgentToolParameters, ToolOutput};
