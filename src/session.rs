//! Conversation session and message history
//!
//! A [`Session`] owns the ordered, append-only history of one conversation.
//! Message content is a tagged union whose variant must agree with the
//! message role; [`Message::new`] enforces the pairing.

use crate::llm::{ContentBlock, LlmMessage};
use crate::tools::ToolOutput;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

/// Result of one tool invocation, keyed by the call it answers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    pub call_id: String,
    pub tool_name: String,
    pub output: ToolOutput,
    pub is_error: bool,
}

/// Message payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MessageContent {
    Text(String),
    ToolCalls(Vec<ToolCall>),
    ToolResults(Vec<ToolResult>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("{role:?} message cannot carry {content} content")]
    RoleMismatch { role: Role, content: &'static str },
    #[error("{0} list must not be empty")]
    Empty(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    role: Role,
    content: MessageContent,
}

impl Message {
    /// Build a message, rejecting role/content pairings that make no sense.
    pub fn new(role: Role, content: MessageContent) -> Result<Self, MessageError> {
        let kind = match &content {
            MessageContent::Text(_) => "text",
            MessageContent::ToolCalls(calls) if calls.is_empty() => {
                return Err(MessageError::Empty("tool call"))
            }
            MessageContent::ToolCalls(_) => "tool call",
            MessageContent::ToolResults(results) if results.is_empty() => {
                return Err(MessageError::Empty("tool result"))
            }
            MessageContent::ToolResults(_) => "tool result",
        };

        let allowed = matches!(
            (role, &content),
            (Role::User | Role::Assistant, MessageContent::Text(_))
                | (Role::Assistant, MessageContent::ToolCalls(_))
                | (Role::Tool, MessageContent::ToolResults(_))
        );
        if !allowed {
            return Err(MessageError::RoleMismatch {
                role,
                content: kind,
            });
        }

        Ok(Self { role, content })
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn tool_calls(calls: Vec<ToolCall>) -> Result<Self, MessageError> {
        Self::new(Role::Assistant, MessageContent::ToolCalls(calls))
    }

    #[allow(dead_code)] // Used in tests
    pub fn tool_results(results: Vec<ToolResult>) -> Result<Self, MessageError> {
        Self::new(Role::Tool, MessageContent::ToolResults(results))
    }

    /// The assistant/tool pair for one executed tool round.
    ///
    /// Callers hand over at least one call and one result per call; the
    /// executor only builds a round after the model asked for tools.
    pub(crate) fn tool_round(calls: Vec<ToolCall>, results: Vec<ToolResult>) -> [Self; 2] {
        debug_assert!(!calls.is_empty() && calls.len() == results.len());
        [
            Self {
                role: Role::Assistant,
                content: MessageContent::ToolCalls(calls),
            },
            Self {
                role: Role::Tool,
                content: MessageContent::ToolResults(results),
            },
        ]
    }

    pub fn role(&self) -> Role {
        self.role
    }

    #[allow(dead_code)] // Used in tests
    pub fn content(&self) -> &MessageContent {
        &self.content
    }

    #[allow(dead_code)] // Used in tests
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Provider-facing rendering of this message
    pub fn to_llm_message(&self) -> LlmMessage {
        match &self.content {
            MessageContent::Text(text) => match self.role {
                Role::Assistant => LlmMessage::assistant(vec![ContentBlock::text(text.clone())]),
                Role::User | Role::Tool => LlmMessage::user(vec![ContentBlock::text(text.clone())]),
            },
            MessageContent::ToolCalls(calls) => LlmMessage::assistant(
                calls
                    .iter()
                    .map(|c| ContentBlock::tool_use(&c.id, &c.name, c.input.clone()))
                    .collect(),
            ),
            MessageContent::ToolResults(results) => LlmMessage::user(
                results
                    .iter()
                    .map(|r| ContentBlock::tool_result(&r.call_id, r.output.to_model_text(), r.is_error))
                    .collect(),
            ),
        }
    }
}

/// One continuous conversation
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    messages: Vec<Message>,
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            messages: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[allow(dead_code)] // Used in tests
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Owned copy of the history, for tracing
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append a batch in order; used to commit a finished turn
    pub(crate) fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
