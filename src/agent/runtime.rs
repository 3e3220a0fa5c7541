//! `SqlAgent`: drives the graph for one question at a time.
//!
//! An agent is built once and shared. Every [`SqlAgent::query`] call owns a
//! fresh [`Conversation`], so concurrent queries never see each other's
//! messages.

use std::sync::Arc;

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::Instrument;
use uuid::Uuid;

use super::conversation::Conversation;
use super::events::{RunEventEmitter, RunEventPayload, RunEventSink, RunId, RunLifecycle};
use super::graph::{self, Node};
use super::policy::{Decision, Policy};
use super::prompts::Prompts;
use super::steps::{self, Gateway, StepOutput};
use crate::config::{AgentSettings, Text2SqlConfig};
use crate::database::SqlDatabase;
use crate::error::{Result, Text2SqlError};
use crate::provider::{create_provider, ModelProvider};
use crate::tools::sql::{SqlToolkit, LIST_TABLES_TOOL};
use crate::tools::ToolNode;
use crate::types::{AgentToolCall, ModelMessage, Usage};
use crate::util::retry::RetryPolicy;
use crate::util::sql::extract_sql_query;

/// Answer returned when the step ceiling is reached.
pub const BUDGET_EXHAUSTED_ANSWER: &str =
    "Unable to process the query with the current context. Please review the input and try again.";

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QueryOutcome {
    /// The model produced an `Answer:`.
    Answered,
    /// The model asked for more information.
    Clarification,
    /// The step ceiling was reached first.
    BudgetExhausted,
}

/// Result of one [`SqlAgent::query`] call.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    /// Most recent `SELECT` statement in the transcript.
    pub sql_query: Option<String>,
    /// Final answer, or the fixed fallback when the budget ran out.
    pub answer: Option<String>,
    pub outcome: QueryOutcome,
    /// Node executions used.
    pub steps: usize,
    pub retry_count: u32,
    pub usage: Usage,
    /// Full transcript of the run.
    pub conversation: Conversation,
}

impl QueryResult {
    /// The model's clarification request, when the run ended on one.
    pub fn clarification(&self) -> Option<String> {
        if self.outcome != QueryOutcome::Clarification {
            return None;
        }
        self.conversation.last().map(|msg| msg.text().trim().to_string())
    }
}

/// Everything needed to build a [`SqlAgent`].
#[derive(Builder)]
pub struct SqlAgentConfig {
    /// Gateway to the language model.
    pub provider: Arc<dyn ModelProvider>,
    /// Database the tools run against.
    pub database: Arc<dyn SqlDatabase>,
    #[builder(default)]
    pub settings: AgentSettings,
    /// Defaults to prompts for the database's dialect.
    pub prompts: Option<Prompts>,
    pub event_sink: Option<RunEventSink>,
    /// Defaults to `settings.retry_attempts` with exponential backoff.
    pub retry_policy: Option<RetryPolicy>,
}

/// Text-to-SQL agent. Cheap to clone; clones share tools and provider.
#[derive(Clone)]
pub struct SqlAgent {
    inner: Arc<AgentInner>,
}

struct AgentInner {
    gateway: Gateway,
    toolkit: SqlToolkit,
    prompts: Prompts,
    policy: Policy,
    max_steps: usize,
    event_sink: Option<RunEventSink>,
    list_tables_node: ToolNode,
    schema_node: ToolNode,
    query_node: ToolNode,
}

impl std::fmt::Debug for SqlAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let provider = self.inner.gateway.provider();
        f.debug_struct("SqlAgent")
            .field("provider", &provider.provider_name())
            .field("model", &provider.model_id())
            .field("max_steps", &self.inner.max_steps)
            .finish()
    }
}

impl SqlAgent {
    pub fn new(config: SqlAgentConfig) -> Result<Self> {
        let SqlAgentConfig {
            provider,
            database,
            settings,
            prompts,
            event_sink,
            retry_policy,
        } = config;
        if settings.max_steps == 0 {
            return Err(Text2SqlError::Configuration(
                "max_steps must be at least 1".into(),
            ));
        }

        let prompts = prompts.unwrap_or_else(|| Prompts::for_dialect(database.dialect()));
        let retry = retry_policy
            .unwrap_or_else(|| RetryPolicy::with_max_attempts(settings.retry_attempts));
        let toolkit = SqlToolkit::new(database);
        let tool_timeout = settings.tool_timeout();

        tracing::info!(
            provider = provider.provider_name(),
            model = provider.model_id(),
            max_steps = settings.max_steps,
            "sql agent initialized"
        );

        Ok(Self {
            inner: Arc::new(AgentInner {
                gateway: Gateway::new(provider, settings.generation_settings(), retry),
                list_tables_node: ToolNode::new([Arc::clone(&toolkit.list_tables)])
                    .with_timeout(tool_timeout),
                schema_node: ToolNode::new([Arc::clone(&toolkit.get_schema)])
                    .with_timeout(tool_timeout),
                query_node: ToolNode::new([Arc::clone(&toolkit.query)]).with_timeout(tool_timeout),
                toolkit,
                prompts,
                policy: Policy {
                    terminate_on_clarification: settings.terminate_on_clarification,
                },
                max_steps: settings.max_steps,
                event_sink,
            }),
        })
    }

    /// Build an agent whose provider comes from `settings.model` and `config`.
    pub fn from_settings(
        settings: AgentSettings,
        config: &Text2SqlConfig,
        database: Arc<dyn SqlDatabase>,
    ) -> Result<Self> {
        let provider = create_provider(&settings.language_model()?, config)?;
        Self::new(
            SqlAgentConfig::builder()
                .provider(provider)
                .database(database)
                .settings(settings)
                .build(),
        )
    }

    /// Answer `question` against the database.
    ///
    /// Reaching the step ceiling is not an error: the result then carries the
    /// fixed fallback answer. Errors are gateway failures that survived
    /// retries and broken conversation invariants.
    pub async fn query(&self, question: &str) -> Result<QueryResult> {
        let run_id: RunId = Uuid::new_v4();
        let span = tracing::info_span!("text2sql.query", run_id = %run_id);
        let emitter = RunEventEmitter::new(run_id, self.inner.event_sink.clone());

        async {
            tracing::info!(question, "query received");
            emitter.lifecycle(RunLifecycle::Started {
                question: question.to_string(),
            });
            match self.run(question, &emitter).await {
                Ok(result) => {
                    tracing::info!(
                        outcome = %result.outcome,
                        steps = result.steps,
                        retries = result.retry_count,
                        sql = result.sql_query.as_deref().unwrap_or(""),
                        "query finished"
                    );
                    emitter.lifecycle(RunLifecycle::Completed {
                        outcome: result.outcome,
                    });
                    Ok(result)
                }
                Err(err) => {
                    tracing::error!(error = %err, "query failed");
                    emitter.lifecycle(RunLifecycle::Failed {
                        error: err.to_string(),
                    });
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, question: &str, emitter: &RunEventEmitter) -> Result<QueryResult> {
        let inner = &*self.inner;
        let mut conversation = Conversation::from_question(question);
        let mut usage = Usage::default();
        let mut node = Node::Start;
        let mut previous = Node::Start;
        let mut last_decision: Option<Decision> = None;
        let mut steps_taken = 0;

        while !node.is_terminal() {
            if steps_taken >= inner.max_steps {
                tracing::warn!(steps = steps_taken, node = %node, "step ceiling reached");
                return Ok(QueryResult {
                    sql_query: None,
                    answer: Some(BUDGET_EXHAUSTED_ANSWER.to_string()),
                    outcome: QueryOutcome::BudgetExhausted,
                    steps: steps_taken,
                    retry_count: conversation.retry_count(),
                    usage,
                    conversation,
                });
            }
            if steps_taken > 0 && graph::is_retry(previous, node) {
                conversation = conversation.with_retry();
            }
            steps_taken += 1;
            tracing::debug!(step = steps_taken, node = %node, "entering node");
            emitter.emit(RunEventPayload::NodeEntered { node, step: steps_taken });

            let mut decision = None;
            match node {
                Node::Start => {
                    let call = AgentToolCall::new(LIST_TABLES_TOOL, serde_json::json!({}));
                    conversation =
                        conversation.append(ModelMessage::assistant_with_tool_calls("", vec![call]))?;
                }
                Node::ListTables => {
                    conversation = self
                        .run_tools(&inner.list_tables_node, conversation, emitter)
                        .await?;
                }
                Node::ResolveSchema => {
                    let out = steps::resolve_schema(
                        &inner.gateway,
                        &inner.prompts.resolve_schema,
                        inner.toolkit.get_schema.as_ref(),
                        &conversation,
                    )
                    .await?;
                    conversation = accept(conversation, out, &mut usage)?;
                }
                Node::FetchSchema => {
                    conversation = self.run_tools(&inner.schema_node, conversation, emitter).await?;
                }
                Node::GenerateQuery => {
                    let out = steps::generate_query(
                        &inner.gateway,
                        &inner.prompts.generate_query,
                        &conversation,
                    )
                    .await?;
                    let made = inner.policy.decide(&out.message.text());
                    tracing::debug!(decision = made.kind(), "generation decided");
                    emitter.emit(RunEventPayload::Decision {
                        decision: made.clone(),
                    });
                    conversation = accept(conversation, out, &mut usage)?;
                    decision = Some(made);
                }
                Node::CheckQuery => {
                    let out = steps::check_query(
                        &inner.gateway,
                        &inner.prompts.check_query,
                        inner.toolkit.query.as_ref(),
                        &conversation,
                    )
                    .await?;
                    conversation = accept(conversation, out, &mut usage)?;
                }
                Node::ExecuteQuery => {
                    conversation = self.run_tools(&inner.query_node, conversation, emitter).await?;
                }
                Node::End => {
                    return Err(Text2SqlError::InvalidState("end state executed".into()));
                }
            }

            let next = graph::next(node, decision.as_ref())?;
            if decision.is_some() {
                last_decision = decision;
            }
            previous = node;
            node = next;
        }

        let (outcome, answer) = match last_decision {
            Some(Decision::Final(answer)) => (QueryOutcome::Answered, Some(answer)),
            Some(Decision::Clarify(_)) => (QueryOutcome::Clarification, None),
            other => {
                return Err(Text2SqlError::InvalidState(format!(
                    "run ended without a terminal decision: {other:?}"
                )))
            }
        };

        Ok(QueryResult {
            sql_query: extract_sql_query(conversation.messages()),
            answer,
            outcome,
            steps: steps_taken,
            retry_count: conversation.retry_count(),
            usage,
            conversation,
        })
    }

    async fn run_tools(
        &self,
        tool_node: &ToolNode,
        conversation: Conversation,
        emitter: &RunEventEmitter,
    ) -> Result<Conversation> {
        for call in conversation.pending_tool_calls() {
            emitter.emit(RunEventPayload::ToolCallStarted { call: call.clone() });
        }
        let results = tool_node.run(&conversation).await?;
        for message in &results {
            if let Some(result) = message.tool_result_part() {
                emitter.emit(RunEventPayload::ToolResult {
                    result: result.clone(),
                });
            }
        }
        conversation.append_all(results)
    }
}

fn accept(conversation: Conversation, out: StepOutput, usage: &mut Usage) -> Result<Conversation> {
    usage.merge(&out.usage);
    conversation.append(out.message)
}
