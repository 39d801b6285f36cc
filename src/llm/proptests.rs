//! Property-based tests for the `OpenAI` translation layer
//!
//! - Message translation never produces empty output
//! - Every tool result becomes exactly one `tool` message, in order
//! - Tool calls with empty names are dropped from responses
//! - Unparsable tool arguments degrade to an empty object

use super::openai::{
    normalize_response, translate_message, OpenAIChoice, OpenAIFunctionCall, OpenAIMessage,
    OpenAIResponse, OpenAIToolCall,
};
use super::types::{ContentBlock, LlmMessage, MessageRole};
use proptest::prelude::*;

fn arb_text_block() -> impl Strategy<Value = ContentBlock> {
    "[a-zA-Z0-9 _.!?,]{1,60}".prop_map(|text| ContentBlock::Text { text })
}

fn arb_tool_use_block() -> impl Strategy<Value = ContentBlock> {
    ("call_[a-z0-9]{4,12}", "[a-zA-Z_]{3,16}", "[a-zA-Z ]{0,20}").prop_map(
        |(id, name, city)| ContentBlock::ToolUse {
            id,
            name,
            input: serde_json::json!({ "city": city }),
        },
    )
}

fn arb_tool_result_block() -> impl Strategy<Value = ContentBlock> {
    ("call_[a-z0-9]{4,12}", "[a-zA-Z0-9 .]{0,60}", any::<bool>()).prop_map(
        |(tool_use_id, content, is_error)| ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        },
    )
}

fn arb_message() -> impl Strategy<Value = LlmMessage> {
    prop_oneof![
        proptest::collection::vec(arb_text_block(), 0..3).prop_map(LlmMessage::user),
        proptest::collection::vec(arb_tool_result_block(), 1..4).prop_map(LlmMessage::user),
        proptest::collection::vec(prop_oneof![arb_text_block(), arb_tool_use_block()], 0..4)
            .prop_map(LlmMessage::assistant),
    ]
}

fn response_with_calls(calls: Vec<(String, String, String)>) -> OpenAIResponse {
    OpenAIResponse {
        choices: vec![OpenAIChoice {
            message: OpenAIMessage {
                role: "assistant".to_string(),
                content: None,
                tool_calls: Some(
                    calls
                        .into_iter()
                        .map(|(id, name, arguments)| OpenAIToolCall {
                            id,
                            r#type: "function".to_string(),
                            function: OpenAIFunctionCall { name, arguments },
                        })
                        .collect(),
                ),
                tool_call_id: None,
            },
            finish_reason: Some("tool_calls".to_string()),
        }],
        usage: None,
    }
}

proptest! {
    #[test]
    fn translation_never_empty(msg in arb_message()) {
        let out = translate_message(&msg);
        prop_assert!(!out.is_empty());
    }

    #[test]
    fn tool_results_map_one_to_one(msg in arb_message()) {
        let expected: Vec<&str> = msg
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolResult { tool_use_id, .. } => Some(tool_use_id.as_str()),
                _ => None,
            })
            .collect();

        let out = translate_message(&msg);
        let actual: Vec<&str> = out
            .iter()
            .filter(|m| m.role == "tool")
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();

        prop_assert_eq!(expected, actual);
    }

    #[test]
    fn assistant_calls_survive_translation(msg in arb_message()) {
        prop_assume!(msg.role == MessageRole::Assistant);
        let calls = msg
            .content
            .iter()
            .filter(|b| matches!(b, ContentBlock::ToolUse { .. }))
            .count();

        let out = translate_message(&msg);
        let translated: usize = out
            .iter()
            .map(|m| m.tool_calls.as_ref().map_or(0, Vec::len))
            .sum();
        prop_assert_eq!(calls, translated);
    }

    #[test]
    fn empty_tool_names_dropped(
        names in proptest::collection::vec(prop_oneof![Just(String::new()), "[a-zA-Z]{1,10}"], 0..6)
    ) {
        let non_empty = names.iter().filter(|n| !n.is_empty()).count();
        let calls = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| (format!("call_{i}"), name, "{}".to_string()))
            .collect();

        let response = normalize_response(response_with_calls(calls)).unwrap();
        prop_assert_eq!(response.tool_uses().len(), non_empty);
        prop_assert!(!response.end_turn);
    }

    #[test]
    fn bad_arguments_become_empty_object(garbage in "[a-z{}:,\"]{0,20}") {
        prop_assume!(serde_json::from_str::<serde_json::Value>(&garbage).is_err());
        let response = normalize_response(response_with_calls(vec![(
            "call_1".to_string(),
            "getWeather".to_string(),
            garbage,
        )]))
        .unwrap();

        let uses = response.tool_uses();
        prop_assert_eq!(uses.len(), 1);
        prop_assert_eq!(uses[0].2, &serde_json::json!({}));
    }
}
