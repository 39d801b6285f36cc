//! Tool registry
//!
//! Tools are capabilities the model may ask us to run. Each one is
//! registered under a unique name with a description, an input schema and
//! an executor. Input is validated against the schema before the executor
//! ever sees it, and executors get no handle on the conversation.

#[cfg(test)]
mod proptests;
pub mod schema;
mod weather;

pub use schema::{FieldKind, ToolSchema, ValidatedInput, ValidationError};
pub use weather::WeatherTool;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default bound on a single executor call
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(10);

/// Result from tool execution
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Text(String),
    Structured(Value),
}

impl ToolOutput {
    /// What the model sees
    pub fn to_model_text(&self) -> String {
        match self {
            ToolOutput::Text(text) => text.clone(),
            ToolOutput::Structured(value) => value.to_string(),
        }
    }
}

/// Executor failed after receiving valid input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolExecutionError {
    #[error("tool {tool} failed: {message}")]
    Failed { tool: String, message: String },
    #[error("tool {tool} timed out after {}ms", .after.as_millis())]
    TimedOut { tool: String, after: Duration },
}

impl ToolExecutionError {
    pub fn failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Execution(#[from] ToolExecutionError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("tool already registered: {0}")]
    DuplicateTool(String),
}

/// Capability invoked with schema-validated input
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, input: &ValidatedInput) -> Result<ToolOutput, ToolExecutionError>;
}

/// A registered tool
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub schema: ToolSchema,
    executor: Arc<dyn ToolExecutor>,
}

impl ToolDefinition {
    pub fn spec(&self) -> crate::llm::ToolSpec {
        crate::llm::ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.schema.to_json_schema(),
        }
    }
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Name-keyed collection of tools, in registration order
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
    index: HashMap<String, usize>,
    timeout: Duration,
}

impl ToolRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
            timeout,
        }
    }

    /// Registry with the built-in weather tool
    pub fn standard(timeout: Duration, weather_seed: Option<u64>) -> Result<Self, RegistryError> {
        let mut registry = Self::new(timeout);
        registry.register_weather(weather_seed)?;
        Ok(registry)
    }

    /// Add `getWeather`, seeded for reproducible reports when asked
    pub fn register_weather(&mut self, seed: Option<u64>) -> Result<(), RegistryError> {
        let weather = match seed {
            Some(seed) => WeatherTool::with_seed(seed),
            None => WeatherTool::new(),
        };
        self.register(
            WeatherTool::NAME,
            WeatherTool::DESCRIPTION,
            WeatherTool::schema(),
            Arc::new(weather),
        )
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        schema: ToolSchema,
        executor: Arc<dyn ToolExecutor>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        self.index.insert(name.clone(), self.tools.len());
        self.tools.push(ToolDefinition {
            name,
            description: description.into(),
            schema,
            executor,
        });
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&ToolDefinition, ToolError> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Get all tool definitions for the LLM
    pub fn definitions(&self) -> Vec<crate::llm::ToolSpec> {
        self.tools.iter().map(ToolDefinition::spec).collect()
    }

    /// Look up, validate, then run under the registry timeout.
    pub async fn execute(&self, name: &str, input: &Value) -> Result<ToolOutput, ToolError> {
        let tool = self.lookup(name)?;
        let validated = tool.schema.validate(input)?;

        let started = std::time::Instant::now();
        let result = tokio::time::timeout(self.timeout, tool.executor.execute(&validated))
            .await
            .map_err(|_| ToolExecutionError::TimedOut {
                tool: name.to_string(),
                after: self.timeout,
            })
            .and_then(|r| r);

        match &result {
            Ok(_) => tracing::debug!(
                tool = %name,
                duration_ms = %started.elapsed().as_millis(),
                "Tool executed"
            ),
            Err(e) => tracing::warn!(tool = %name, error = %e, "Tool execution failed"),
        }

        result.map_err(ToolError::from)
    }
}
