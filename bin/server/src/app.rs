//! Application state and router.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use support_relay_conversation::ConversationOrchestrator;
use tower_http::trace::TraceLayer;

use crate::routes;

/// Request body limit unless configured otherwise.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 16 * 1024 * 1024;

/// Shared application state.
pub struct AppState {
    /// Runs conversation turns.
    pub orchestrator: ConversationOrchestrator,
    /// Largest accepted request body, in bytes.
    pub max_request_bytes: usize,
}

impl AppState {
    /// Creates a new application state with the default body limit.
    pub fn new(orchestrator: ConversationOrchestrator) -> Self {
        Self {
            orchestrator,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
        }
    }

    /// Overrides the request body limit.
    #[must_use]
    pub fn with_max_request_bytes(mut self, max_request_bytes: usize) -> Self {
        self.max_request_bytes = max_request_bytes;
        self
    }
}

/// Builds the HTTP router.
///
/// Bodies over the configured limit are answered with 413.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_request_bytes);
    Router::new()
        .route("/", get(routes::index))
        .route("/session", post(routes::create_session))
        .route("/ask", post(routes::ask))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
