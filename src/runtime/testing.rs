//! Test doubles for the model, tools and trace sink
//!
//! These mocks let turn and session tests run without network access.

use crate::llm::{ContentBlock, LlmError, LlmRequest, LlmResponse, LlmService, Usage};
use crate::tools::{ToolExecutionError, ToolExecutor, ToolOutput, ValidatedInput};
use crate::trace::{TraceError, TraceRecord, TraceSink};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Mock LLM
// ============================================================================

/// Model that replays queued responses in order
pub struct MockLlmService {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmService {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Queue a response asking for one tool call
    pub fn queue_tool_call(&self, id: &str, name: &str, input: Value) {
        self.queue_response(tool_call_response(&[(id, name, input)]));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Response carrying only tool calls
pub fn tool_call_response(calls: &[(&str, &str, Value)]) -> LlmResponse {
    LlmResponse {
        content: calls
            .iter()
            .map(|(id, name, input)| ContentBlock::tool_use(*id, *name, input.clone()))
            .collect(),
        end_turn: false,
        usage: Usage {
            input_tokens: 20,
            output_tokens: 5,
        },
    }
}

// ============================================================================
// Tools
// ============================================================================

/// Echoes its `text` field back and remembers every call
#[derive(Default)]
pub struct EchoTool {
    calls: Mutex<Vec<String>>,
}

impl EchoTool {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolExecutor for EchoTool {
    async fn execute(&self, input: &ValidatedInput) -> Result<ToolOutput, ToolExecutionError> {
        let text = input.get_str("text").unwrap_or_default().to_string();
        self.calls.lock().unwrap().push(text.clone());
        Ok(ToolOutput::Text(text))
    }
}

/// Sleeps before answering
pub struct SlowTool {
    delay: Duration,
}

impl SlowTool {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl ToolExecutor for SlowTool {
    async fn execute(&self, _input: &ValidatedInput) -> Result<ToolOutput, ToolExecutionError> {
        tokio::time::sleep(self.delay).await;
        Ok(ToolOutput::Text("done".to_string()))
    }
}

/// Always fails after validation
pub struct FailingTool;

#[async_trait]
impl ToolExecutor for FailingTool {
    async fn execute(&self, _input: &ValidatedInput) -> Result<ToolOutput, ToolExecutionError> {
        Err(ToolExecutionError::failed("broken", "backend unavailable"))
    }
}

// ============================================================================
// Trace sinks
// ============================================================================

/// Keeps every record it receives
#[derive(Default)]
pub struct MemoryTraceSink {
    records: Mutex<Vec<TraceRecord>>,
    delay: Option<Duration>,
}

impl MemoryTraceSink {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            delay: Some(delay),
        }
    }

    pub fn records(&self) -> Vec<TraceRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl TraceSink for MemoryTraceSink {
    async fn write(&self, record: &TraceRecord) -> Result<(), TraceError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Rejects everything
pub struct FailingTraceSink;

#[async_trait]
impl TraceSink for FailingTraceSink {
    async fn write(&self, _record: &TraceRecord) -> Result<(), TraceError> {
        Err(TraceError::Transport("connection refused".to_string()))
    }
}
