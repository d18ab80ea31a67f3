//! Database access for the support-relay server.
//!
//! This module provides the SQLite-backed conversation store and the
//! embedded schema migrations it runs at startup.

pub mod conversation;

pub use conversation::SqliteConversationStore;
