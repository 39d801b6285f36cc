//! Single-turn execution
//!
//! A turn appends the user's message, asks the model for a reply, runs any
//! tools the model requests, and asks again with their results. Everything
//! the model produces during the turn is staged and only committed to the
//! session once the final reply exists, so a failed turn leaves exactly one
//! new message (the user's) behind.

use crate::llm::{LlmError, LlmRequest, LlmService, ToolChoice, Usage};
use crate::session::{Message, Role, Session, ToolCall, ToolResult};
use crate::tools::{ToolError, ToolExecutionError, ToolOutput, ToolRegistry};
use crate::trace::{TraceEmitter, TraceMetadata, TraceRecord};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("generation failed: {0}")]
    Generation(#[from] LlmError),
    #[error("model requested unknown tool: {0}")]
    ToolNotFound(String),
    #[error(transparent)]
    ToolExecution(#[from] ToolExecutionError),
}

#[derive(Debug, Clone)]
pub struct TurnSettings {
    pub system_prompt: Option<String>,
    /// Model calls that may request tools; the call after the last round
    /// must answer in text
    pub max_tool_rounds: u32,
    pub max_tokens: Option<u32>,
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_tool_rounds: 1,
            max_tokens: None,
        }
    }
}

/// Work done so far in the current turn
#[derive(Default)]
struct TurnProgress {
    staged: Vec<Message>,
    tool_rounds: u32,
    usage: Usage,
}

pub struct TurnExecutor {
    llm: Arc<dyn LlmService>,
    tools: Arc<ToolRegistry>,
    tracer: TraceEmitter,
    settings: TurnSettings,
}

impl TurnExecutor {
    pub fn new(
        llm: Arc<dyn LlmService>,
        tools: Arc<ToolRegistry>,
        tracer: TraceEmitter,
        settings: TurnSettings,
    ) -> Self {
        Self {
            llm,
            tools,
            tracer,
            settings,
        }
    }

    pub fn tracer(&self) -> &TraceEmitter {
        &self.tracer
    }

    /// Run one turn and return the assistant's reply.
    ///
    /// On success the session grows by the user message, any tool call and
    /// tool result pairs, and the reply. On failure it grows by the user
    /// message only. A trace record is emitted either way.
    pub async fn execute_turn(
        &self,
        session: &mut Session,
        user_text: &str,
    ) -> Result<String, TurnError> {
        let started = Instant::now();
        session.push(Message::user(user_text));
        let input = session.snapshot();
        let turn_index = session
            .messages()
            .iter()
            .filter(|m| m.role() == Role::User)
            .count() as u64;

        let mut progress = TurnProgress::default();
        let result = self.run_model(session.messages(), &mut progress).await;

        let reply = match result {
            Ok(reply) => {
                session.extend(progress.staged.drain(..));
                session.push(Message::assistant_text(reply.clone()));
                tracing::info!(
                    session_id = %session.id(),
                    turn_index,
                    tool_rounds = progress.tool_rounds,
                    input_tokens = progress.usage.input_tokens,
                    output_tokens = progress.usage.output_tokens,
                    duration_ms = %started.elapsed().as_millis(),
                    "Turn completed"
                );
                Ok(reply)
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %session.id(),
                    turn_index,
                    tool_rounds = progress.tool_rounds,
                    error = %e,
                    "Turn failed"
                );
                Err(e)
            }
        };

        self.tracer.record_turn(TraceRecord::new(
            input,
            session.snapshot(),
            TraceMetadata {
                session_id: session.id(),
                model: self.llm.model_id().to_string(),
                turn_index,
                tool_rounds: progress.tool_rounds,
                error: reply.as_ref().err().map(ToString::to_string),
            },
        ));

        reply
    }

    async fn run_model(
        &self,
        history: &[Message],
        progress: &mut TurnProgress,
    ) -> Result<String, TurnError> {
        loop {
            let may_call_tools =
                !self.tools.is_empty() && progress.tool_rounds < self.settings.max_tool_rounds;
            let request = self.build_request(history, &progress.staged, may_call_tools);
            let response = self.llm.complete(&request).await?;
            progress.usage.add(response.usage);

            let calls: Vec<ToolCall> = response
                .tool_uses()
                .into_iter()
                .map(|(id, name, input)| ToolCall {
                    id: id.to_string(),
                    name: name.to_string(),
                    input: input.clone(),
                })
                .collect();

            if calls.is_empty() || !may_call_tools {
                if !calls.is_empty() {
                    tracing::warn!(
                        calls = calls.len(),
                        "Ignoring tool calls past the round limit"
                    );
                }
                return Ok(response.text());
            }

            progress.tool_rounds += 1;
            let results = self.run_tools(&calls).await?;
            progress.staged.extend(Message::tool_round(calls, results));
        }
    }

    fn build_request(
        &self,
        history: &[Message],
        staged: &[Message],
        may_call_tools: bool,
    ) -> LlmRequest {
        LlmRequest {
            system: self.settings.system_prompt.clone(),
            messages: history
                .iter()
                .chain(staged)
                .map(Message::to_llm_message)
                .collect(),
            tools: self.tools.definitions(),
            tool_choice: if may_call_tools {
                ToolChoice::Auto
            } else {
                ToolChoice::None
            },
            max_tokens: self.settings.max_tokens,
        }
    }

    /// Run calls in request order. Bad input goes back to the model as an
    /// error result; anything else ends the turn.
    async fn run_tools(&self, calls: &[ToolCall]) -> Result<Vec<ToolResult>, TurnError> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            let (output, is_error) = match self.tools.execute(&call.name, &call.input).await {
                Ok(output) => (output, false),
                Err(ToolError::Validation(e)) => {
                    tracing::debug!(tool = %call.name, error = %e, "Tool input rejected");
                    (ToolOutput::Text(e.to_string()), true)
                }
                Err(ToolError::NotFound(name)) => return Err(TurnError::ToolNotFound(name)),
                Err(ToolError::Execution(e)) => return Err(e.into()),
            };
            results.push(ToolResult {
                call_id: call.id.clone(),
                tool_name: call.name.clone(),
                output,
                is_error,
            });
        }
        Ok(results)
    }
}
