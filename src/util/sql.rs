//! Helpers for pulling SQL statements out of model text.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::ModelMessage;
use crate::tools::sql::QUERY_TOOL;

fn select_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Lazy: stop at the first semicolon after SELECT.
        Regex::new(r"(?is)SELECT.*?;").expect("valid regex")
    })
}

fn statement_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?ism)^\s*(?:SELECT|WITH|INSERT|UPDATE|DELETE|CREATE|DROP|ALTER)\b.*?(?:;|\z)")
            .expect("valid regex")
    })
}

fn inline_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Keyword plus its clause, so a bare "select" in prose does not match.
        Regex::new(
            r"(?is)\b(?:SELECT\b.+?\bFROM|WITH\s+\w+\s+AS\s*\(|INSERT\s+INTO|UPDATE\s+\w+\s+SET|DELETE\s+FROM|(?:CREATE|DROP|ALTER)\s+(?:TABLE|VIEW|INDEX))\b.*?(?:;|\z)",
        )
        .expect("valid regex")
    })
}

/// First `SELECT ...;` statement in `text`, if any.
pub fn find_select(text: &str) -> Option<String> {
    select_pattern()
        .find(text)
        .map(|m| m.as_str().trim().to_string())
}

/// First SQL-looking statement in `text`, terminated by `;` or end of text.
///
/// The statement must start a line, so prose that merely mentions "select"
/// does not count. Markdown code fences are stripped first.
pub fn first_sql_statement(text: &str) -> Option<String> {
    let cleaned = strip_code_fences(text);
    statement_pattern()
        .find(&cleaned)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// SQL statement anywhere in `text`.
///
/// Tries a statement starting a line, then `SELECT ...;`, then a statement
/// embedded in prose such as `The query is SELECT name FROM students`.
pub fn locate_sql(text: &str) -> Option<String> {
    first_sql_statement(text)
        .or_else(|| find_select(text))
        .or_else(|| {
            inline_pattern()
                .find(&strip_code_fences(text))
                .map(|m| m.as_str().trim().to_string())
        })
}

/// Whether `text` contains anything that looks like a SQL statement.
pub fn contains_sql(text: &str) -> bool {
    locate_sql(text).is_some()
}

/// Most recent SQL query in a transcript.
///
/// Messages are scanned newest first. For each, the text content is searched
/// for a `SELECT ...;` statement, then any `db_query_tool` call arguments.
pub fn extract_sql_query(messages: &[ModelMessage]) -> Option<String> {
    messages.iter().rev().find_map(|msg| {
        if let Some(sql) = find_select(&msg.text()) {
            return Some(sql);
        }
        msg.tool_calls()
            .into_iter()
            .filter(|call| call.name == QUERY_TOOL)
            .find_map(|call| {
                let query = match &call.arguments {
                    serde_json::Value::String(s) => Some(s.as_str()),
                    other => other.get("query").and_then(|v| v.as_str()),
                }?;
                find_select(query).or_else(|| first_sql_statement(query))
            })
    })
}

fn strip_code_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}
