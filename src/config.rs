//! Runtime configuration from the process environment

use crate::llm::OpenAIModel;
use crate::tools::DEFAULT_TOOL_TIMEOUT;
use crate::trace::{TraceProject, DEFAULT_TRACE_TIMEOUT};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PROJECT_NAME: &str = "weather-chat";
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_MAX_TOOL_ROUNDS: u32 = 1;
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. \
When the user asks about the weather, use the getWeather tool and answer with its result.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} has an invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub openai_api_key: String,
    pub trace_api_key: String,
    pub model: OpenAIModel,
    /// Override for the provider host (proxy, gateway)
    pub openai_base_url: Option<String>,
    pub trace_url: String,
    /// `TRACE_PROJECT_ID` when set, otherwise the `TRACE_PROJECT` name
    pub trace_project: TraceProject,
    pub system_prompt: String,
    pub max_tool_rounds: u32,
    pub tool_timeout: Duration,
    pub llm_timeout: Duration,
    pub trace_timeout: Duration,
    /// Fixed seed for the weather tool
    pub tool_seed: Option<u64>,
}

impl ChatConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let openai_api_key = get("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;
        let trace_api_key = get("TRACE_API_KEY").ok_or(ConfigError::Missing("TRACE_API_KEY"))?;

        let model = match get("CHAT_MODEL") {
            None => OpenAIModel::default(),
            Some(id) => OpenAIModel::from_id(id.trim()).ok_or_else(|| ConfigError::Invalid {
                var: "CHAT_MODEL",
                reason: format!(
                    "expected one of {}",
                    OpenAIModel::ALL
                        .iter()
                        .map(|m| m.api_name())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
                value: id,
            })?,
        };

        let trace_project = match parse_var("TRACE_PROJECT_ID", get("TRACE_PROJECT_ID"))? {
            Some(id) => TraceProject::Id(id),
            None => TraceProject::Name(
                get("TRACE_PROJECT")
                    .map_or_else(|| DEFAULT_PROJECT_NAME.to_string(), |n| n.trim().to_string()),
            ),
        };

        Ok(Self {
            openai_api_key,
            trace_api_key,
            model,
            openai_base_url: get("OPENAI_BASE_URL"),
            trace_url: get("TRACE_API_URL")
                .unwrap_or_else(|| crate::trace::DEFAULT_TRACE_URL.to_string()),
            trace_project,
            system_prompt: get("CHAT_SYSTEM_PROMPT")
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            max_tool_rounds: parse_var("CHAT_MAX_TOOL_ROUNDS", get("CHAT_MAX_TOOL_ROUNDS"))?
                .unwrap_or(DEFAULT_MAX_TOOL_ROUNDS),
            tool_timeout: secs_var("CHAT_TOOL_TIMEOUT_SECS", get("CHAT_TOOL_TIMEOUT_SECS"))?
                .unwrap_or(DEFAULT_TOOL_TIMEOUT),
            llm_timeout: secs_var("CHAT_LLM_TIMEOUT_SECS", get("CHAT_LLM_TIMEOUT_SECS"))?
                .unwrap_or(DEFAULT_LLM_TIMEOUT),
            trace_timeout: secs_var("CHAT_TRACE_TIMEOUT_SECS", get("CHAT_TRACE_TIMEOUT_SECS"))?
                .unwrap_or(DEFAULT_TRACE_TIMEOUT),
            tool_seed: parse_var("CHAT_TOOL_SEED", get("CHAT_TOOL_SEED"))?,
        })
    }
}

fn parse_var<T>(var: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|v| {
            v.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                var,
                reason: e.to_string(),
                value: v,
            })
        })
        .transpose()
}

fn secs_var(var: &'static str, value: Option<String>) -> Result<Option<Duration>, ConfigError> {
    match parse_var::<u64>(var, value)? {
        Some(0) => Err(ConfigError::Invalid {
            var,
            value: "0".to_string(),
            reason: "must be at least 1 second".to_string(),
        }),
        other => Ok(other.map(Duration::from_secs)),
    }
}
