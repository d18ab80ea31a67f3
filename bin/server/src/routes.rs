//! HTTP handlers for the chat page, session creation and turns.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::Html,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use support_relay_conversation::TurnOutcome;
use support_relay_core::ChatSessionId;

use crate::{app::AppState, error::ApiError};

/// The chat page served at `/`.
const CHAT_PAGE: &str = include_str!("../assets/chatbot.html");

/// Response body for `POST /session`.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
}

/// Request body for `POST /ask`.
///
/// Both fields are optional so that absence can be reported as
/// `Missing data` instead of a deserialization error.
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AskRequest {
    /// Returns both fields if present and non-empty.
    fn into_parts(self) -> Option<(String, String)> {
        let session_id = self.session_id.filter(|s| !s.is_empty())?;
        let message = self.message.filter(|m| !m.is_empty())?;
        Some((session_id, message))
    }
}

/// Serves the chat page.
pub async fn index() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

/// Starts a new chat session.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state.orchestrator.start_session().await?;
    Ok(Json(SessionResponse {
        session_id: session.id.to_string(),
    }))
}

/// Handles one customer message and returns the generated reply.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<TurnOutcome>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected /ask body");
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::MissingData
        }
    })?;
    let (session_id, message) = request.into_parts().ok_or(ApiError::MissingData)?;

    // An identifier we never issued cannot name an existing session.
    let id = ChatSessionId::from_str(&session_id)
        .map_err(|_| ApiError::SessionNotFound { session_id })?;

    let outcome = state.orchestrator.handle_turn(id, &message).await?;
    Ok(Json(outcome))
}
