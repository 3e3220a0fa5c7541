//! Shared test helpers: scripted providers and a seeded school database.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use text2sql::database::SqliteDatabase;
use text2sql::error::Text2SqlError;
use text2sql::provider::{ModelProvider, ProviderRequest, ProviderResponse};
use text2sql::tools::{GET_SCHEMA_TOOL, QUERY_TOOL};
use text2sql::types::*;
use text2sql::util::sql::locate_sql;

pub const GRADE_9A_SQL: &str = "SELECT s.name FROM students s JOIN classes c ON s.class_id = c.id WHERE c.name = 'Grade 9A' ORDER BY s.name;";

fn usage(input: u32, output: u32) -> Usage {
    Usage {
        input_tokens: input,
        output_tokens: output,
        total_tokens: input + output,
    }
}

/// A mock provider that replays canned responses in order.
#[derive(Default)]
pub struct MockProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a text response.
    pub fn queue_response(&self, text: &str) {
        self.responses.lock().unwrap().push(ProviderResponse {
            text: text.to_string(),
            usage: usage(10, 20),
            tool_calls: vec![],
            finish_reason: Some(FinishReason::Stop),
        });
    }

    /// Queue a tool call response.
    pub fn queue_tool_call(&self, name: &str, args: serde_json::Value) {
        self.responses.lock().unwrap().push(ProviderResponse {
            text: String::new(),
            usage: usage(10, 5),
            tool_calls: vec![AgentToolCall::new(name, args)],
            finish_reason: Some(FinishReason::ToolCalls),
        });
    }

    /// Requests seen so far.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }

    async fn generate_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderResponse, Text2SqlError> {
        self.requests.lock().unwrap().push(request.clone());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(Text2SqlError::InvalidState(
                "mock provider has no more responses".into(),
            ));
        }
        Ok(responses.remove(0))
    }
}

/// A provider that reacts to the conversation it is sent, so any number of
/// runs can share it.
///
/// It picks both tables, writes the query registered for the question, asks
/// to execute the candidate, rewrites queries listed in `fixes` after a
/// failure, and answers with the raw rows.
#[derive(Default)]
pub struct SchoolModel {
    first_attempts: HashMap<String, String>,
    fixes: HashMap<String, String>,
    pub calls: AtomicUsize,
}

impl SchoolModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, question: &str, sql: &str) -> Self {
        self.first_attempts
            .insert(question.to_string(), sql.to_string());
        self
    }

    pub fn with_fix(mut self, broken: &str, fixed: &str) -> Self {
        self.fixes.insert(broken.to_string(), fixed.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn generate(&self, messages: &[ModelMessage]) -> String {
        let question = messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| m.text())
            .unwrap_or_default();

        let Some(result) = messages.iter().rev().find_map(|m| m.tool_result_part()) else {
            return "Error: no tool output to work from".to_string();
        };
        let call = messages
            .iter()
            .flat_map(|m| m.tool_calls())
            .find(|c| c.id == result.tool_call_id)
            .cloned();

        match call {
            Some(call) if call.name == QUERY_TOOL => {
                if result.is_error {
                    let failed = call.arguments["query"].as_str().unwrap_or_default();
                    self.fixes
                        .get(failed)
                        .cloned()
                        .unwrap_or_else(|| format!("Error: cannot repair {failed}"))
                } else {
                    format!("Answer: {}", result.content)
                }
            }
            _ => self
                .first_attempts
                .get(&question)
                .cloned()
                .unwrap_or_else(|| "Error: I do not know this question".to_string()),
        }
    }
}

#[async_trait]
impl ModelProvider for SchoolModel {
    fn provider_name(&self) -> &str {
        "school"
    }

    fn model_id(&self) -> &str {
        "school-model"
    }

    async fn generate_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderResponse, Text2SqlError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let bound: Vec<&str> = request
            .tools
            .iter()
            .flatten()
            .map(|t| t.name.as_str())
            .collect();
        let messages = &request.messages;

        let response = if bound.contains(&GET_SCHEMA_TOOL) {
            ProviderResponse {
                tool_calls: vec![AgentToolCall::new(
                    GET_SCHEMA_TOOL,
                    serde_json::json!({"table_names": "classes, students"}),
                )],
                finish_reason: Some(FinishReason::ToolCalls),
                ..Default::default()
            }
        } else if bound.contains(&QUERY_TOOL) {
            let candidate = messages.last().map(|m| m.text()).unwrap_or_default();
            let query = locate_sql(&candidate).unwrap_or(candidate);
            ProviderResponse {
                tool_calls: vec![AgentToolCall::new(
                    QUERY_TOOL,
                    serde_json::json!({ "query": query }),
                )],
                finish_reason: Some(FinishReason::ToolCalls),
                ..Default::default()
            }
        } else {
            ProviderResponse {
                text: self.generate(messages),
                finish_reason: Some(FinishReason::Stop),
                ..Default::default()
            }
        };

        Ok(ProviderResponse {
            usage: usage(12, 8),
            ..response
        })
    }
}

/// `classes(1 Grade 9A, 2 Grade 10B)` and `students(Alice, Bob in 9A; Chen in 10B)`
/// in a temporary file. Keep the directory alive for the test's duration.
pub async fn school_db() -> (tempfile::TempDir, Arc<SqliteDatabase>) {
    let dir = tempfile::tempdir().unwrap();
    let db = SqliteDatabase::open(dir.path().join("school.db")).unwrap();
    db.execute_batch(
        "CREATE TABLE classes (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
         CREATE TABLE students (
             id INTEGER PRIMARY KEY,
             name TEXT NOT NULL,
             class_id INTEGER REFERENCES classes(id)
         );
         INSERT INTO classes VALUES (1, 'Grade 9A'), (2, 'Grade 10B');
         INSERT INTO students VALUES (1, 'Alice', 1), (2, 'Bob', 1), (3, 'Chen', 2);",
    )
    .await
    .unwrap();
    (dir, Arc::new(db))
}
