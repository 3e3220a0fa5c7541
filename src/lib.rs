//! text2sql: answer natural-language questions from a SQL database.
//!
//! A [`SqlAgent`](agent::SqlAgent) lists the tables, asks the model which
//! schemas it needs, then loops through generate, check and execute until the
//! model produces an `Answer:`, asks for clarification, or the step budget
//! runs out.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use text2sql::prelude::*;
//!
//! # async fn example() -> text2sql::error::Result<()> {
//! let db = SqliteDatabase::open("school.db")?;
//! let agent = SqlAgent::from_settings(
//!     AgentSettings::default(),
//!     &Text2SqlConfig::from_env(),
//!     Arc::new(db),
//! )?;
//! let result = agent.query("List all students in Grade 9A").await?;
//! println!("{:?} -> {:?}", result.sql_query, result.answer);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod prelude;
pub mod provider;
pub mod tools;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
