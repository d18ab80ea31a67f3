//! Language generation primitives for support-relay.
//!
//! This crate provides:
//!
//! - **Backend**: the [`LlmBackend`] trait every provider implements
//! - **Gemini**: a backend for Google's Generative Language REST API
//! - **LLM Call**: single-shot inference bounded by a timeout

pub mod backend;
pub mod error;
pub mod gemini;
pub mod llm_call;

pub use backend::{LlmBackend, LlmBackendConfig, LlmProvider, LlmRequest, LlmResponse, TokenUsage};
pub use error::LlmError;
pub use gemini::GeminiBackend;
pub use llm_call::{LlmCall, LlmCallResult, LlmInvocationId};
