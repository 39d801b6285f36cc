//! Weather chat - terminal assistant with a weather tool
//!
//! Reads user lines from stdin, answers through an LLM that may call the
//! `getWeather` tool, and ships a trace of every turn to a logging backend.

mod config;
mod llm;
mod runtime;
mod session;
mod tools;
mod trace;

use config::ChatConfig;
use llm::{LlmService, LoggingService, OpenAIService};
use runtime::{run_session, TurnExecutor, TurnSettings};
use session::Session;
use std::sync::Arc;
use tools::ToolRegistry;
use trace::{HttpTraceSink, TraceEmitter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout is the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weather_chat=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = ChatConfig::from_env()?;

    let provider = OpenAIService::new(
        config.openai_api_key.clone(),
        config.model,
        config.openai_base_url.as_deref(),
        config.llm_timeout,
    )?;
    let llm: Arc<dyn LlmService> = Arc::new(LoggingService::new(Arc::new(provider)));

    let tools = Arc::new(ToolRegistry::standard(config.tool_timeout, config.tool_seed)?);
    tracing::debug!(tools = tools.len(), "Tool registry ready");

    let sink = HttpTraceSink::connect(
        &config.trace_url,
        &config.trace_project,
        config.trace_api_key.clone(),
        config.trace_timeout,
    )
    .await?;
    tracing::debug!(endpoint = %sink.endpoint(), "Trace sink ready");
    let tracer = TraceEmitter::new(Arc::new(sink), config.trace_timeout);

    let executor = TurnExecutor::new(
        llm,
        tools,
        tracer,
        TurnSettings {
            system_prompt: Some(config.system_prompt.clone()),
            max_tool_rounds: config.max_tool_rounds,
            max_tokens: None,
        },
    );

    let mut session = Session::new();
    tracing::info!(
        session_id = %session.id(),
        model = %config.model.api_name(),
        trace_project = %config.trace_project,
        "Session started"
    );

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let result = run_session(&executor, &mut session, stdin, tokio::io::stdout()).await;

    // Flush traces even when the terminal went away mid-session
    executor.tracer().shutdown(config.trace_timeout).await;
    let summary = result?;
    tracing::info!(
        turns = summary.turns,
        failed_turns = summary.failed_turns,
        "Goodbye"
    );

    Ok(())
}
