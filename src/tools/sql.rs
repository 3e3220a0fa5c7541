//! SQL toolkit: the three database tools the agent binds to the model.
//!
//! Each tool is an [`AgentTool`] closure over a shared [`SqlDatabase`], in the
//! same shape as any other tool, so the execution node needs no special
//! casing for them.

use std::sync::Arc;

use crate::database::SqlDatabase;
use crate::error::Text2SqlError;
use crate::tools::tool::{AgentTool, Tool, ToolExecutionContext};
use crate::tools::types::AgentToolParameters;

pub const LIST_TABLES_TOOL: &str = "sql_db_list_tables";
pub const GET_SCHEMA_TOOL: &str = "sql_db_schema";
pub const QUERY_TOOL: &str = "db_query_tool";

/// Returned by the query tool when a statement yields nothing usable.
pub const QUERY_FAILED_MESSAGE: &str =
    "Error: Query failed. Please rewrite your query and try again.";

/// The tools built over one database.
#[derive(Clone)]
pub struct SqlToolkit {
    pub list_tables: Arc<dyn Tool>,
    pub get_schema: Arc<dyn Tool>,
    pub query: Arc<dyn Tool>,
}

impl SqlToolkit {
    pub fn new(db: Arc<dyn SqlDatabase>) -> Self {
        Self {
            list_tables: list_tables_tool(Arc::clone(&db)),
            get_schema: get_schema_tool(Arc::clone(&db)),
            query: query_tool(db),
        }
    }

    /// All tools, in graph order.
    pub fn all(&self) -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::clone(&self.list_tables),
            Arc::clone(&self.get_schema),
            Arc::clone(&self.query),
        ]
    }
}

/// `sql_db_list_tables`: comma-separated names of every table.
pub fn list_tables_tool(db: Arc<dyn SqlDatabase>) -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        LIST_TABLES_TOOL,
        "Input is an empty string, output is a comma-separated list of tables in the database.",
        AgentToolParameters::object()
            .string("tool_input", "An empty string", false)
            .build(),
        move |_args, _ctx: ToolExecutionContext| {
            let db = Arc::clone(&db);
            async move {
                let tables = db.list_tables().await?;
                Ok::<_, Text2SqlError>(tables.join(", "))
            }
        },
    ))
}

/// `sql_db_schema`: DDL and sample rows for a comma-separated table list.
pub fn get_schema_tool(db: Arc<dyn SqlDatabase>) -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        GET_SCHEMA_TOOL,
        "Input to this tool is a comma-separated list of tables, output is the schema and \
         sample rows for those tables. Be sure that the tables actually exist by calling \
         sql_db_list_tables first! Example Input: table1, table2, table3",
        AgentToolParameters::object()
            .string(
                "table_names",
                "A comma-separated list of the table names for which to return the schema.",
                true,
            )
            .build(),
        move |args, _ctx: ToolExecutionContext| {
            let db = Arc::clone(&db);
            async move {
                let tables = split_table_names(args.get_str_lenient("table_names")?);
                if tables.is_empty() {
                    return Err(Text2SqlError::tool(
                        GET_SCHEMA_TOOL,
                        "no table names given",
                    ));
                }
                db.table_info(&tables).await
            }
        },
    ))
}

/// `db_query_tool`: run a statement and return its rows.
///
/// Driver errors and empty results both come back as errors so the model
/// rewrites the query instead of answering from nothing.
pub fn query_tool(db: Arc<dyn SqlDatabase>) -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        QUERY_TOOL,
        "Execute a SQL query against the database and get back the result. \
         If the query is not correct, an error message will be returned. \
         If an error is returned, rewrite the query, check the query, and try again.",
        AgentToolParameters::object()
            .string("query", "The SQL statement to execute", true)
            .build(),
        move |args, _ctx: ToolExecutionContext| {
            let db = Arc::clone(&db);
            async move {
                let sql = args.get_str_lenient("query")?.trim().to_string();
                tracing::info!(query = %sql, "executing query");
                let output = db.run_no_throw(&sql).await;
                if output.starts_with("Error:") {
                    tracing::warn!(query = %sql, error = %output, "query failed");
                    return Err(Text2SqlError::tool(QUERY_TOOL, output));
                }
                if output.trim().is_empty() {
                    tracing::warn!(query = %sql, "query returned no rows");
                    return Err(Text2SqlError::tool(QUERY_TOOL, QUERY_FAILED_MESSAGE));
                }
                Ok(output)
            }
        },
    ))
}

/// Split a model-supplied table list, tolerating stray quotes and spaces.
pub fn split_table_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|name| name.trim().trim_matches(|c| c == '"' || c == '\'' || c == '`'))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::SqliteDatabase;
    use crate::tools::arguments::ToolArguments;
    use pretty_assertions::assert_eq;

    async fn toolkit() -> SqlToolkit {
        let db = SqliteDatabase::open_in_memory().unwrap();
        db.execute_batch(
            "CREATE TABLE classes (id INTEGER PRIMARY KEY, name TEXT);
             CREATE TABLE students (id INTEGER PRIMARY KEY, name TEXT, class_id INTEGER);
             INSERT INTO classes VALUES (1, 'Grade 9A');
             INSERT INTO students VALUES (1, 'Alice', 1);",
        )
        .await
        .unwrap();
        SqlToolkit::new(Arc::new(db))
    }

    fn ctx() -> ToolExecutionContext {
        ToolExecutionContext::default()
    }

    #[test]
    fn split_table_names_tolerates_noise() {
        assert_eq!(
            split_table_names(" students, 'classes' ,, `grades`"),
            vec!["students", "classes", "grades"]
        );
    }

    #[tokio::test]
    async fn list_tables_is_comma_separated() {
        let kit = toolkit().await;
        let out = kit
            .list_tables
            .invoke(&ToolArguments::new(serde_json::json!({})), &ctx())
            .await;
        assert!(!out.is_error);
        assert_eq!(out.text, "classes, students");
    }

    #[tokio::test]
    async fn schema_tool_reports_unknown_tables() {
        let kit = toolkit().await;
        let out = kit
            .get_schema
            .invoke(
                &ToolArguments::new(serde_json::json!({"table_names": "students, pets"})),
                &ctx(),
            )
            .await;
        assert!(out.is_error);
        assert!(out.text.starts_with("Error: table_names {'pets'}"));
    }

    #[tokio::test]
    async fn query_tool_treats_empty_result_as_failure() {
        let kit = toolkit().await;
        let out = kit
            .query
            .invoke(
                &ToolArguments::new(serde_json::json!({"query": "SELECT * FROM students WHERE id = 42;"})),
                &ctx(),
            )
            .await;
        assert!(out.is_error);
        assert_eq!(out.text, QUERY_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn query_tool_surfaces_driver_error() {
        let kit = toolkit().await;
        let out = kit
            .query
            .invoke(
                &ToolArguments::new(serde_json::json!({"query": "SELECT grade FROM students;"})),
                &ctx(),
            )
            .await;
        assert!(out.is_error);
        assert!(out.text.starts_with("Error: "));
        assert!(out.text.contains("no such column"));
    }

    #[tokio::test]
    async fn query_tool_returns_rows() {
        let kit = toolkit().await;
        let out = kit
            .query
            .invoke(
                &ToolArguments::new(serde_json::json!({"query": "SELECT name FROM students;"})),
                &ctx(),
            )
            .await;
        assert_eq!(out, crate::tools::ToolOutput::ok("[('Alice',)]"));
    }
}
