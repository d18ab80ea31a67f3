//! Core domain types and utilities for support-relay.
//!
//! This crate provides the identifiers and error handling shared by the
//! conversation, AI, and server crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ChatSessionId, ParseIdError, TurnId};
