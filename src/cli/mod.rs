//! CLI entry point for text2sql.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::agent::{QueryResult, SqlAgent};
use crate::config::{AgentSettings, Text2SqlConfig};
use crate::database::SqliteDatabase;
use crate::error::{Result, Text2SqlError};

/// Ask questions of a SQLite database in plain language.
#[derive(Parser, Debug)]
#[command(name = "text2sql", version, about = "Natural-language questions over SQL databases")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer one question and print the SQL used
    Ask(AskArgs),
}

/// Arguments for `text2sql ask`.
#[derive(Parser, Debug)]
pub struct AskArgs {
    /// Path to the SQLite database file
    #[arg(long)]
    pub db: PathBuf,

    /// Model to use (format: provider:model, e.g., groq:llama3-70b-8192)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Maximum node executions before giving up
    #[arg(long)]
    pub max_steps: Option<usize>,

    /// Settings file (defaults to ~/.text2sql/config.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the full JSON result instead of SQL and answer
    #[arg(long)]
    pub json: bool,

    /// The question to answer
    pub question: String,
}

impl AskArgs {
    /// Settings from file and environment, with flags applied last.
    pub fn settings(&self) -> Result<AgentSettings> {
        let mut settings = match &self.config {
            Some(path) => AgentSettings::load(path)?.with_env_overrides()?,
            None => AgentSettings::load_default()?,
        };
        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        if let Some(max_steps) = self.max_steps {
            settings.max_steps = max_steps;
        }
        settings.language_model()?;
        Ok(settings)
    }
}

/// Run `text2sql ask`.
pub async fn handle_ask(args: AskArgs) -> Result<()> {
    if !args.db.exists() {
        return Err(Text2SqlError::Configuration(format!(
            "database file not found: {}",
            args.db.display()
        )));
    }
    let settings = args.settings()?;
    let database = SqliteDatabase::open(&args.db)?;
    let agent = SqlAgent::from_settings(settings, &Text2SqlConfig::from_env(), Arc::new(database))?;

    let result = agent.query(&args.question).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

fn print_result(result: &QueryResult) {
    println!("SQL:    {}", result.sql_query.as_deref().unwrap_or("-"));
    match (result.answer.as_deref(), result.clarification()) {
        (Some(answer), _) => println!("Answer: {answer}"),
        (None, Some(question)) => println!("Needs clarification: {question}"),
        (None, None) => println!("Answer: -"),
    }
}
