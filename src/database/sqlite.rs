//! SQLite executor backed by `rusqlite`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::Connection;

use super::SqlDatabase;
use crate::error::{Result, Text2SqlError};

const SAMPLE_ROWS: usize = 3;

/// SQLite database shared by all agent runs.
///
/// The connection sits behind a mutex and every call runs on the blocking
/// pool, so concurrent queries are serialized at the driver.
#[derive(Clone)]
pub struct SqliteDatabase {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDatabase").finish_non_exhaustive()
    }
}

impl SqliteDatabase {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        tracing::info!(path = %path.display(), "sqlite database opened");
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run a batch of statements directly, bypassing the agent.
    pub async fn execute_batch(&self, sql: &str) -> Result<()> {
        let sql = sql.to_string();
        self.with_conn(move |conn| Ok(conn.execute_batch(&sql)?)).await
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| Text2SqlError::Database("connection lock poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| Text2SqlError::Database(format!("database task failed: {e}")))?
    }
}

#[async_trait]
impl SqlDatabase for SqliteDatabase {
    fn dialect(&self) -> &str {
        "SQLite"
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        self.with_conn(table_names).await
    }

    async fn table_info(&self, tables: &[String]) -> Result<String> {
        let requested = tables.to_vec();
        self.with_conn(move |conn| {
            let known = table_names(conn)?;
            let targets = if requested.is_empty() {
                known.clone()
            } else {
                requested
            };
            let missing: Vec<&String> = targets.iter().filter(|t| !known.contains(t)).collect();
            if !missing.is_empty() {
                let names = missing
                    .iter()
                    .map(|t| format!("'{t}'"))
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(Text2SqlError::Database(format!(
                    "table_names {{{names}}} not found in database"
                )));
            }

            let mut sections = Vec::with_capacity(targets.len());
            for table in &targets {
                let ddl: String = conn.query_row(
                    "SELECT sql FROM sqlite_master WHERE name = ?1",
                    [table],
                    |row| row.get(0),
                )?;
                sections.push(format!(
                    "{}\n\n{}",
                    ddl.trim(),
                    sample_block(conn, table, SAMPLE_ROWS)?
                ));
            }
            Ok(sections.join("\n\n"))
        })
        .await
    }

    async fn run(&self, sql: &str) -> Result<String> {
        let sql = sql.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let column_count = stmt.column_count();
            if column_count == 0 {
                stmt.execute([])?;
                return Ok(String::new());
            }

            let mut rows = stmt.query([])?;
            let mut rendered = Vec::new();
            while let Some(row) = rows.next()? {
                let mut values = Vec::with_capacity(column_count);
                for idx in 0..column_count {
                    values.push(render_literal(row.get_ref(idx)?));
                }
                rendered.push(render_tuple(&values));
            }
            if rendered.is_empty() {
                return Ok(String::new());
            }
            Ok(format!("[{}]", rendered.join(", ")))
        })
        .await
    }
}

fn table_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master \
         WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' \
         ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names)
}

fn sample_block(conn: &Connection, table: &str, limit: usize) -> Result<String> {
    let quoted = table.replace('"', "\"\"");
    let mut stmt = conn.prepare(&format!("SELECT * FROM \"{quoted}\" LIMIT {limit}"))?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let column_count = columns.len();

    let mut lines = vec![format!("{limit} rows from {table} table:"), columns.join("\t")];
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            values.push(render_plain(row.get_ref(idx)?));
        }
        lines.push(values.join("\t"));
    }
    Ok(format!("/*\n{}\n*/", lines.join("\n")))
}

fn render_plain(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "None".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

fn render_literal(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Text(t) => format!("'{}'", String::from_utf8_lossy(t).replace('\'', "\\'")),
        other => render_plain(other),
    }
}

fn render_tuple(values: &[String]) -> String {
    if values.len() == 1 {
        format!("({},)", values[0])
    } else {
        format!("({})", values.join(", "))
    }
}
