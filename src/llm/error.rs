//! Provider failures, classified by what a caller could do about them

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
    /// Server-provided backoff hint, when one was sent
    pub retry_after: Option<Duration>,
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Network, message)
    }

    #[cfg(test)]
    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::ServerError, message)
    }

    #[cfg(test)]
    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Auth, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Unknown, message)
    }

    /// Error for a non-2xx provider response
    pub fn from_status(status: u16, detail: &str, retry_after: Option<Duration>) -> Self {
        let kind = LlmErrorKind::from_status(status);
        let message = match kind {
            LlmErrorKind::Unknown => format!("HTTP {status}: {detail}"),
            _ => format!("{}: {detail}", kind.label()),
        };
        Self {
            kind,
            message,
            retry_after,
        }
    }

    /// Error for a request that never produced a response
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network(format!("Request timeout: {err}"))
        } else if err.is_connect() {
            Self::network(format!("Connection failed: {err}"))
        } else {
            Self::unknown(format!("Request failed: {err}"))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    Network,
    RateLimit,
    ServerError,
    /// Bad or missing API key (401, 403)
    Auth,
    /// Provider refused the payload (400)
    InvalidRequest,
    Unknown,
}

impl LlmErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Auth,
            429 => Self::RateLimit,
            400 => Self::InvalidRequest,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::ServerError)
    }

    fn label(self) -> &'static str {
        match self {
            Self::Network => "Network error",
            Self::RateLimit => "Rate limit exceeded",
            Self::ServerError => "Server error",
            Self::Auth => "Authentication failed",
            Self::InvalidRequest => "Invalid request",
            Self::Unknown => "Unexpected response",
        }
    }
}
