//! Client error types

use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// The relay or the REST surface refused the request
    #[error("{code}: {message}")]
    Rejected {
        status: Option<u16>,
        code: String,
        message: String,
    },

    /// Rejected locally before anything was sent
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Operation not allowed while session is {0}")]
    InvalidState(&'static str),

    #[error("Send timed out")]
    Timeout,

    #[error("Relay connection closed")]
    Disconnected,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn rejected(
        status: Option<u16>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Rejected {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Wire-style code, for display and matching
    pub fn code(&self) -> &str {
        match self {
            Self::Rejected { code, .. } => code,
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::Timeout => "TIMEOUT",
            Self::Disconnected | Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Decode(_) => "DECODE_ERROR",
        }
    }

    /// Whether trying the same operation again may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Rejected { status, code, .. } => {
                code == "PERSISTENCE_ERROR" || status.is_some_and(|s| s >= 500)
            }
            Self::Timeout | Self::Disconnected | Self::Transport(_) => true,
            Self::Validation(_) | Self::InvalidState(_) | Self::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
