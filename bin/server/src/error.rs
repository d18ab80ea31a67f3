//! HTTP-facing error type.
//!
//! Every failure reaching a handler is turned into a small JSON body
//! `{"error": "..."}` with a generic message. Details go to the log only.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;
use support_relay_ai::LlmError;
use support_relay_conversation::{StoreError, TurnError};

/// Errors returned by the HTTP handlers.
#[derive(Debug)]
pub enum ApiError {
    /// A required request field is absent or empty, or the body is malformed.
    MissingData,
    /// The request body exceeds the configured limit.
    PayloadTooLarge,
    /// The referenced session does not exist or the identifier is malformed.
    SessionNotFound { session_id: String },
    /// The generation provider failed or timed out.
    Generation(LlmError),
    /// The conversation store failed.
    Persistence(StoreError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
}

impl ApiError {
    /// Returns the status code and client-facing message.
    #[must_use]
    pub fn status_and_message(&self) -> (StatusCode, &'static str) {
        match self {
            Self::MissingData => (StatusCode::BAD_REQUEST, "Missing data"),
            Self::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "Request too large"),
            Self::SessionNotFound { .. } | Self::Persistence(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            Self::Generation(LlmError::Timeout) => {
                (StatusCode::GATEWAY_TIMEOUT, "Timed out generating a reply")
            }
            Self::Generation(_) => (StatusCode::BAD_GATEWAY, "Failed to generate a reply"),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingData => write!(f, "missing data"),
            Self::PayloadTooLarge => write!(f, "request body too large"),
            Self::SessionNotFound { session_id } => write!(f, "session '{session_id}' not found"),
            Self::Generation(err) => write!(f, "generation failed: {err}"),
            Self::Persistence(err) => write!(f, "persistence failed: {err}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<TurnError> for ApiError {
    fn from(err: TurnError) -> Self {
        match err {
            TurnError::SessionNotFound { id } => Self::SessionNotFound {
                session_id: id.to_string(),
            },
            TurnError::Generation(e) => Self::Generation(e),
            TurnError::Persistence(e) => Self::Persistence(e),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::from(TurnError::from(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::MissingData => tracing::debug!("Rejected request with missing data"),
            Self::PayloadTooLarge => tracing::warn!("Rejected oversized request body"),
            Self::SessionNotFound { session_id } => {
                tracing::warn!(session_id = %session_id, "Unknown chat session");
            }
            Self::Generation(e) => tracing::error!(error = %e, "Reply generation failed"),
            Self::Persistence(e) => tracing::error!(error = %e, "Conversation store failed"),
        }

        let (status, message) = self.status_and_message();
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
