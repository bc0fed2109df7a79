//! Handler error types

use crate::protocol::CloseCode;
use chat_core::protocol::ErrorPayload;
use chat_core::Snowflake;
use chat_service::ServiceError;
use thiserror::Error;

/// Handler error type
///
/// Reported to the originating connection as an `error` event; only internal
/// failures end the connection.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Send user_online first")]
    NotAuthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Wire code carried by the `error` event
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPayload(_) => "VALIDATION_ERROR",
            Self::NotAuthenticated => "NOT_AUTHENTICATED",
            Self::Forbidden(_) => "AUTHORIZATION_ERROR",
            Self::Service(e) => e.error_code(),
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to a close code (if the connection cannot continue)
    pub fn to_close_code(&self) -> Option<CloseCode> {
        match self {
            Self::Internal(_) => Some(CloseCode::UnknownError),
            _ => None,
        }
    }

    /// Message safe to show the client; storage details stay in the logs
    pub fn client_message(&self) -> String {
        match self {
            Self::Service(e) if e.is_persistence() => "Failed to save, try again".to_string(),
            _ => self.to_string(),
        }
    }

    /// `error` payload addressed to the request that failed
    pub fn to_payload(&self, chat_id: Option<Snowflake>, nonce: Option<String>) -> ErrorPayload {
        let payload = ErrorPayload::new(self.code(), self.client_message()).with_nonce(nonce);
        match chat_id {
            Some(chat_id) => payload.for_chat(chat_id),
            None => payload,
        }
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
