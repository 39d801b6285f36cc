//! Property-based tests for turn history invariants
//!
//! - A successful turn appends user, then (tool calls, tool results) pairs,
//!   then exactly one assistant text reply
//! - A failed turn appends only the user message
//! - Every turn emits exactly one trace whose input is a prefix of its output

use super::testing::{MemoryTraceSink, MockLlmService};
use super::{TurnExecutor, TurnSettings};
use crate::llm::{LlmError, LlmResponse};
use crate::session::{MessageContent, Role, Session};
use crate::tools::{ToolRegistry, DEFAULT_TOOL_TIMEOUT};
use crate::trace::{TraceEmitter, DEFAULT_TRACE_TIMEOUT};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// How the mock model behaves for one turn
#[derive(Debug, Clone)]
enum Script {
    Reply(String),
    Weather(String),
    BadInput,
    Fail,
}

fn arb_script() -> impl Strategy<Value = Script> {
    prop_oneof![
        "[a-zA-Z ]{1,30}".prop_map(Script::Reply),
        "[A-Z][a-z]{2,10}".prop_map(Script::Weather),
        Just(Script::BadInput),
        Just(Script::Fail),
    ]
}

fn queue(llm: &MockLlmService, script: &Script, turn: usize) {
    let id = format!("call_{turn}");
    match script {
        Script::Reply(text) => llm.queue_response(LlmResponse::from_text(text.clone())),
        Script::Weather(city) => {
            llm.queue_tool_call(&id, "getWeather", json!({ "city": city }));
            llm.queue_response(LlmResponse::from_text(format!("Weather for {city}")));
        }
        Script::BadInput => {
            llm.queue_tool_call(&id, "getWeather", json!({ "city": 42 }));
            llm.queue_response(LlmResponse::from_text("Please name a city"));
        }
        Script::Fail => llm.queue_error(LlmError::server_error("unavailable")),
    }
}

fn check_turn_shape(
    session: &Session,
    start: usize,
    script: &Script,
) -> Result<(), TestCaseError> {
    let added = &session.messages()[start..];
    prop_assert_eq!(added[0].role(), Role::User);

    let expected = match script {
        Script::Fail => 1,
        Script::Reply(_) => 2,
        Script::Weather(_) | Script::BadInput => 4,
    };
    prop_assert_eq!(added.len(), expected);

    if added.len() > 1 {
        let last = &added[added.len() - 1];
        prop_assert_eq!(last.role(), Role::Assistant);
        prop_assert!(last.text().is_some());
    }
    if added.len() == 4 {
        prop_assert!(matches!(added[1].content(), MessageContent::ToolCalls(_)));
        let MessageContent::ToolResults(results) = added[2].content() else {
            return Err(TestCaseError::fail("expected tool results"));
        };
        prop_assert_eq!(results.len(), 1);
        prop_assert_eq!(results[0].is_error, matches!(script, Script::BadInput));
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_history_grows_by_turn_shape(scripts in proptest::collection::vec(arb_script(), 1..8)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        rt.block_on(async {
            let llm = Arc::new(MockLlmService::new("gpt-4o"));
            let sink = Arc::new(MemoryTraceSink::default());
            let executor = TurnExecutor::new(
                llm.clone(),
                Arc::new(ToolRegistry::standard(DEFAULT_TOOL_TIMEOUT, Some(11)).unwrap()),
                TraceEmitter::new(sink.clone(), DEFAULT_TRACE_TIMEOUT),
                TurnSettings::default(),
            );
            let mut session = Session::new();

            for (turn, script) in scripts.iter().enumerate() {
                queue(&llm, script, turn);
                let start = session.len();
                let result = executor.execute_turn(&mut session, "hello").await;
                prop_assert_eq!(result.is_err(), matches!(script, Script::Fail));
                check_turn_shape(&session, start, script)?;
            }

            executor.tracer().shutdown(Duration::from_secs(1)).await;
            let records = sink.records();
            prop_assert_eq!(records.len(), scripts.len());
            for record in &records {
                prop_assert!(
                    record.output.len() > record.input.len() || record.metadata.error.is_some()
                );
                prop_assert_eq!(&record.output[..record.input.len()], &record.input[..]);
            }
            Ok::<(), TestCaseError>(())
        })?;
    }
}
