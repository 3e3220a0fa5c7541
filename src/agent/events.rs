//! Run event stream types.
//!
//! Callers observe a run by passing a [`RunEventSink`]; the agent never
//! installs a logger of its own.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::graph::Node;
use super::policy::Decision;
use super::runtime::QueryOutcome;
use crate::types::{AgentToolCall, AgentToolResult};

pub type RunId = Uuid;

/// Callback receiving every event of a run, in order.
pub type RunEventSink = Arc<dyn Fn(RunEvent) + Send + Sync>;

/// Run lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunLifecycle {
    Started { question: String },
    Completed { outcome: QueryOutcome },
    Failed { error: String },
}

/// Concrete event payloads emitted by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEventPayload {
    Lifecycle { state: RunLifecycle },
    NodeEntered { node: Node, step: usize },
    ToolCallStarted { call: AgentToolCall },
    ToolResult { result: AgentToolResult },
    Decision { decision: Decision },
}

/// Envelope for run events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEvent {
    pub run_id: RunId,
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: RunEventPayload,
}

/// Stamps payloads with run id and sequence number and forwards them to the sink.
pub(crate) struct RunEventEmitter {
    run_id: RunId,
    seq: AtomicU64,
    sink: Option<RunEventSink>,
}

impl RunEventEmitter {
    pub(crate) fn new(run_id: RunId, sink: Option<RunEventSink>) -> Self {
        Self {
            run_id,
            seq: AtomicU64::new(1),
            sink,
        }
    }

    pub(crate) fn emit(&self, payload: RunEventPayload) {
        let Some(sink) = &self.sink else { return };
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        (sink)(RunEvent {
            run_id: self.run_id,
            seq,
            timestamp: Utc::now(),
            payload,
        });
    }

    pub(crate) fn lifecycle(&self, state: RunLifecycle) {
        self.emit(RunEventPayload::Lifecycle { state });
    }
}
