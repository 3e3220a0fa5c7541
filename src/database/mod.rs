//! Database executor abstraction consumed by the SQL tools.
//!
//! The agent never talks to a driver directly: tools hold an
//! `Arc<dyn SqlDatabase>` and render everything as text for the model.

pub mod sqlite;

pub use sqlite::SqliteDatabase;

use async_trait::async_trait;

use crate::error::{Result, Text2SqlError};

/// A relational database the agent can inspect and query.
#[async_trait]
pub trait SqlDatabase: Send + Sync {
    /// SQL dialect name shown to the model (e.g. "SQLite").
    fn dialect(&self) -> &str;

    /// Names of all user tables, sorted.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// DDL plus a few sample rows for each named table.
    ///
    /// Unknown table names are an error that names them.
    async fn table_info(&self, tables: &[String]) -> Result<String>;

    /// Run a statement and render its rows as text.
    ///
    /// Returns an empty string when the statement produced no rows.
    async fn run(&self, sql: &str) -> Result<String>;

    /// Like [`run`](Self::run), but a failure comes back as `Error: <message>`.
    async fn run_no_throw(&self, sql: &str) -> String {
        match self.run(sql).await {
            Ok(rows) => rows,
            Err(Text2SqlError::Database(message)) => format!("Error: {message}"),
            Err(err) => format!("Error: {err}"),
        }
    }
}
