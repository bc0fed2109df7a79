//! REST error responses
//!
//! Every failure renders as `{"error": {"code", "message"}}` with the status
//! matching its code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chat_service::ServiceError;
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

/// API error type for consistent error responses
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Invalid path parameter: {0}")]
    InvalidPath(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Missing or invalid X-User-Id header")]
    MissingCaller,
}

impl ApiError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Service(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Self::Validation(_) | Self::InvalidPath(_) | Self::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::MissingCaller => StatusCode::UNAUTHORIZED,
        }
    }

    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Service(e) => e.error_code(),
            Self::Validation(_) | Self::InvalidPath(_) | Self::InvalidRequest(_) => {
                "VALIDATION_ERROR"
            }
            Self::MissingCaller => "NOT_AUTHENTICATED",
        }
    }

    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    fn public_message(&self) -> String {
        match self {
            Self::Service(e) if e.is_persistence() => "Storage is unavailable".to_string(),
            _ => self.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "Server error occurred");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.error_code(),
                message: self.public_message(),
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
