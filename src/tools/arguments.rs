//! Typed access to tool-call arguments.

use crate::error::Text2SqlError;

/// Arguments passed by the model to a tool, as parsed JSON.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments {
    raw: serde_json::Value,
}

impl ToolArguments {
    pub fn new(raw: serde_json::Value) -> Self {
        Self { raw }
    }

    /// The underlying JSON value.
    pub fn raw(&self) -> &serde_json::Value {
        &self.raw
    }

    /// Get a required string argument.
    pub fn get_str(&self, key: &str) -> Result<&str, Text2SqlError> {
        self.raw
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| missing(key, "string"))
    }

    /// Get a string argument, accepting a bare JSON string in place of the object.
    ///
    /// Some models send `"SELECT 1;"` instead of `{"query": "SELECT 1;"}` for
    /// single-parameter tools.
    pub fn get_str_lenient(&self, key: &str) -> Result<&str, Text2SqlError> {
        match &self.raw {
            serde_json::Value::String(s) => Ok(s.as_str()),
            _ => self.get_str(key),
        }
    }
}

fn missing(key: &str, kind: &str) -> Text2SqlError {
    Text2SqlError::InvalidArgument(format!("missing or invalid {kind} argument '{key}'"))
}
