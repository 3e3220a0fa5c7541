//! Tests for the SQL toolkit and the tool execution node.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use common::school_db;
use text2sql::agent::Conversation;
use text2sql::error::Text2SqlError;
use text2sql::tools::sql::QUERY_FAILED_MESSAGE;
use text2sql::tools::*;
use text2sql::types::{AgentToolCall, ModelMessage};

/// Tool implemented on a struct rather than a closure.
struct RowCounter;

#[async_trait]
impl Tool for RowCounter {
    fn name(&self) -> &str {
        "count_rows"
    }

    fn description(&self) -> &str {
        "Counts the rows of a fake table"
    }

    fn parameters(&self) -> &AgentToolParameters {
        static PARAMS: std::sync::OnceLock<AgentToolParameters> = std::sync::OnceLock::new();
        PARAMS.get_or_init(|| {
            AgentToolParameters::object()
                .string("table", "Table name", true)
                .build()
        })
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        _ctx: &ToolExecutionContext,
    ) -> Result<String, Text2SqlError> {
        match args.get_str("table")? {
            "students" => Ok("3".to_string()),
            other => Err(Text2SqlError::tool("count_rows", format!("no such table: {other}"))),
        }
    }
}

#[test]
fn parameter_builder_marks_required_fields() {
    let params = AgentToolParameters::object()
        .string("query", "The SQL statement to execute", true)
        .string("note", "Optional note", false)
        .build();

    assert_eq!(params.schema["type"], "object");
    assert_eq!(params.schema["properties"]["query"]["type"], "string");
    assert_eq!(params.schema["required"], serde_json::json!(["query"]));
}

#[test]
fn lenient_arguments_accept_bare_strings() {
    let args = ToolArguments::new(serde_json::json!("SELECT 1;"));
    assert_eq!(args.get_str_lenient("query").unwrap(), "SELECT 1;");
    assert!(args.get_str("query").is_err());
}

#[tokio::test]
async fn toolkit_tools_are_named_for_the_model() {
    let (_dir, db) = school_db().await;
    let names: Vec<String> = SqlToolkit::new(db)
        .all()
        .iter()
        .map(|tool| tool.name().to_string())
        .collect();
    assert_eq!(names, vec![LIST_TABLES_TOOL, GET_SCHEMA_TOOL, QUERY_TOOL]);
}

#[tokio::test]
async fn node_runs_every_toolkit_request_in_order() {
    let (_dir, db) = school_db().await;
    let node = ToolNode::new(SqlToolkit::new(db).all());

    let calls = vec![
        AgentToolCall::new(LIST_TABLES_TOOL, serde_json::json!({})),
        AgentToolCall::new(GET_SCHEMA_TOOL, serde_json::json!({"table_names": "classes"})),
        AgentToolCall::new(
            QUERY_TOOL,
            serde_json::json!({"query": "SELECT name FROM classes ORDER BY id;"}),
        ),
        AgentToolCall::new(
            QUERY_TOOL,
            serde_json::json!({"query": "SELECT name FROM classes WHERE id = 7;"}),
        ),
    ];
    let conversation = Conversation::from_question("What classes exist?")
        .append(ModelMessage::assistant_with_tool_calls("", calls.clone()))
        .unwrap();

    let results = node.run(&conversation).await.unwrap();
    let parts: Vec<_> = results
        .iter()
        .map(|m| m.tool_result_part().unwrap().clone())
        .collect();

    assert_eq!(parts.len(), 4);
    for (part, call) in parts.iter().zip(&calls) {
        assert_eq!(part.tool_call_id, call.id);
    }
    assert_eq!(parts[0].content, "classes, students");
    assert!(parts[1].content.starts_with("CREATE TABLE classes"));
    assert_eq!(parts[2].content, "[('Grade 9A',), ('Grade 10B',)]");
    assert!(parts[3].is_error);
    assert_eq!(parts[3].content, QUERY_FAILED_MESSAGE);

    let resolved = conversation.append_all(results).unwrap();
    assert!(resolved.pending_tool_calls().is_empty());
}

#[tokio::test]
async fn rerunning_the_node_resolves_the_same_requests() {
    let (_dir, db) = school_db().await;
    let node = ToolNode::new(SqlToolkit::new(db).all());
    let call = AgentToolCall::new(QUERY_TOOL, serde_json::json!({"query": "SELECT COUNT(*) FROM students;"}));
    let conversation = Conversation::from_question("How many students?")
        .append(ModelMessage::assistant_with_tool_calls("", vec![call.clone()]))
        .unwrap();

    let first = node.run(&conversation).await.unwrap();
    let second = node.run(&conversation).await.unwrap();
    assert_eq!(first[0].tool_result_part(), second[0].tool_result_part());

    let resolved = conversation.append_all(first).unwrap();
    assert!(resolved.pending_tool_calls().is_empty());
    // A second resolution of the same request is rejected, not left dangling.
    assert!(resolved.append_all(second).is_err());
}

#[tokio::test]
async fn node_accepts_custom_tools() {
    let node = ToolNode::new([Arc::new(RowCounter) as Arc<dyn Tool>]);

    let ok = node
        .run_call(&AgentToolCall::new(
            "count_rows",
            serde_json::json!({"table": "students"}),
        ))
        .await;
    assert_eq!(ok, ToolOutput::ok("3"));

    let failed = node
        .run_call(&AgentToolCall::new(
            "count_rows",
            serde_json::json!({"table": "pets"}),
        ))
        .await;
    assert_eq!(failed, ToolOutput::error("Error: no such table: pets"));
}

#[tokio::test]
async fn schema_tool_without_names_is_an_error_result() {
    let (_dir, db) = school_db().await;
    let node = ToolNode::new(SqlToolkit::new(db).all());
    let output = node
        .run_call(&AgentToolCall::new(
            GET_SCHEMA_TOOL,
            serde_json::json!({"table_names": " , "}),
        ))
        .await;
    assert!(output.is_error);
    assert_eq!(output.text, "Error: no table names given");
}
