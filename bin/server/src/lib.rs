//! support-relay HTTP server.
//!
//! This crate wires the conversation orchestrator to an axum router and a
//! SQLite conversation store:
//!
//! - `GET /` serves the chat page
//! - `POST /session` starts a conversation
//! - `POST /ask` runs one turn

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;

pub use app::{AppState, router};
pub use config::ServerConfig;
pub use db::SqliteConversationStore;
pub use error::ApiError;
