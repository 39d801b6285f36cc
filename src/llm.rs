//! LLM provider abstraction
//!
//! The turn executor only sees [`LlmService`]; the concrete provider is
//! chosen once at startup.

mod error;
mod openai;
#[cfg(test)]
mod proptests;
mod types;

pub use error::LlmError;
pub use openai::{OpenAIModel, OpenAIService};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for LLM providers
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Make a completion request
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Wraps a provider and reports every call through `tracing`
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        tracing::debug!(
            model = %self.model_id,
            messages = request.messages.len(),
            tools = request.tools.len(),
            tool_choice = ?request.tool_choice,
            "Sending LLM request"
        );

        let started = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let elapsed_ms = started.elapsed().as_millis();

        match &result {
            Ok(response) => tracing::info!(
                model = %self.model_id,
                duration_ms = %elapsed_ms,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                tool_calls = response.tool_uses().len(),
                end_turn = response.end_turn,
                "LLM request completed"
            ),
            Err(e) => tracing::error!(
                model = %self.model_id,
                duration_ms = %elapsed_ms,
                kind = ?e.kind,
                error = %e.message,
                retryable = e.kind.is_retryable(),
                retry_after_secs = e.retry_after.map(|d| d.as_secs()),
                "LLM request failed"
            ),
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
