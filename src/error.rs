//! Request-boundary error taxonomy.
//!
//! DESIGN
//! ======
//! Every service error converges on [`ApiError`], which renders as
//! `{"error": "<message>"}` with a matching status. Internal causes
//! (database, LLM transport) are logged with their grepable code and replaced
//! by a generic message so driver details never reach the caller.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

use crate::db::StoreError;
use crate::llm::types::LlmError;

/// Grepable error codes for logs, shared by every error enum in the crate.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or blank required input.
    #[error("{0}")]
    Validation(String),

    /// A referenced record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Rejected by the fixed-window limiter.
    #[error("Too many requests")]
    RateLimited,

    /// Required credentials or settings are absent.
    #[error("{0}")]
    Configuration(String),

    /// The model answered with no content.
    #[error("{0}")]
    UpstreamEmpty(&'static str),

    /// The model answered, but not with the JSON shape we asked for.
    #[error("{0}")]
    MalformedResponse(String),

    /// Anything else that should never reach the caller verbatim.
    #[error("internal error: {0}")]
    Internal(String),

    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Configuration(_)
            | Self::UpstreamEmpty(_)
            | Self::MalformedResponse(_)
            | Self::Internal(_)
            | Self::Llm(_)
            | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the caller.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Llm(_) => "Failed to get a response from the AI provider".to_owned(),
            Self::Store(_) => "Database operation failed".to_owned(),
            Self::Internal(_) => "Internal server error".to_owned(),
            other => other.to_string(),
        }
    }
}

impl ErrorCode for ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "E_VALIDATION",
            Self::NotFound(_) => "E_NOT_FOUND",
            Self::RateLimited => "E_RATE_LIMITED",
            Self::Configuration(_) => "E_CONFIGURATION",
            Self::UpstreamEmpty(_) => "E_UPSTREAM_EMPTY",
            Self::MalformedResponse(_) => "E_MALFORMED_RESPONSE",
            Self::Internal(_) => "E_INTERNAL",
            Self::Llm(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::RateLimited | Self::UpstreamEmpty(_) => true,
            Self::Llm(e) => e.retryable(),
            _ => false,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.error_code(), retryable = self.retryable(), error = %self, "request failed");
        } else if status != StatusCode::NOT_FOUND {
            warn!(code = self.error_code(), error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
