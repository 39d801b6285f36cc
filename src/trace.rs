//! Per-turn trace records
//!
//! Every turn produces one write-once [`TraceRecord`] holding the history
//! before and after the turn. Records are shipped out of band: emitting a
//! trace never blocks or fails the reply.

mod http;

pub use http::{HttpTraceSink, DEFAULT_TRACE_URL};

use crate::session::Message;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

pub const TURN_NAME: &str = "chat_turn";
pub const TURN_KIND: &str = "llm";
pub const DEFAULT_TRACE_TIMEOUT: Duration = Duration::from_secs(10);

/// Where records land: a project id, or a name the backend resolves to one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceProject {
    Id(Uuid),
    Name(String),
}

impl std::fmt::Display for TraceProject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceMetadata {
    pub session_id: Uuid,
    pub model: String,
    pub turn_index: u64,
    pub tool_rounds: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Logged state of one turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRecord {
    pub id: Uuid,
    pub turn_name: String,
    pub turn_kind: String,
    pub timestamp: DateTime<Utc>,
    /// History as the model saw it, including the new user message
    pub input: Vec<Message>,
    /// History once the turn settled
    pub output: Vec<Message>,
    pub metadata: TraceMetadata,
}

impl TraceRecord {
    pub fn new(input: Vec<Message>, output: Vec<Message>, metadata: TraceMetadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            turn_name: TURN_NAME.to_string(),
            turn_kind: TURN_KIND.to_string(),
            timestamp: Utc::now(),
            input,
            output,
            metadata,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.metadata.session_id
    }
}

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("trace transport failed: {0}")]
    Transport(String),
    #[error("trace sink rejected record with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("trace write timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),
}

/// Destination for trace records
#[async_trait]
pub trait TraceSink: Send + Sync {
    async fn write(&self, record: &TraceRecord) -> Result<(), TraceError>;
}

/// Fire-and-forget front end for a [`TraceSink`]
pub struct TraceEmitter {
    sink: Arc<dyn TraceSink>,
    tracker: TaskTracker,
    timeout: Duration,
}

impl TraceEmitter {
    pub fn new(sink: Arc<dyn TraceSink>, timeout: Duration) -> Self {
        Self {
            sink,
            tracker: TaskTracker::new(),
            timeout,
        }
    }

    /// Hand a record to the sink in the background. Failures are logged only.
    pub fn record_turn(&self, record: TraceRecord) {
        let sink = Arc::clone(&self.sink);
        let timeout = self.timeout;

        self.tracker.spawn(async move {
            let session_id = record.session_id();
            let turn_index = record.metadata.turn_index;
            let result = match tokio::time::timeout(timeout, sink.write(&record)).await {
                Ok(result) => result,
                Err(_) => Err(TraceError::TimedOut(timeout)),
            };

            match result {
                Ok(()) => tracing::debug!(
                    session_id = %session_id,
                    turn_index,
                    "Trace recorded"
                ),
                Err(e) => tracing::warn!(
                    session_id = %session_id,
                    turn_index,
                    error = %e,
                    "Trace emission failed"
                ),
            }
        });
    }

    /// Number of writes still in flight
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Stop accepting work and wait for in-flight writes, up to `grace`.
    pub async fn shutdown(&self, grace: Duration) {
        self.tracker.close();
        tracing::debug!(pending = self.pending(), "Flushing trace writes");
        if tokio::time::timeout(grace, self.tracker.wait()).await.is_err() {
            tracing::warn!(
                pending = self.pending(),
                "Gave up waiting for trace writes"
            );
        }
    }
}
