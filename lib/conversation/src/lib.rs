//! Conversation service for support-relay.
//!
//! This crate provides:
//!
//! - **Conversation Store**: the storage trait plus an in-memory implementation
//! - **Context Builder**: bounded transcript rendering for prompts
//! - **Escalation**: the low-confidence reply heuristic
//! - **Orchestrator**: one user turn from inbound message to recorded reply

pub mod context;
pub mod error;
pub mod escalation;
pub mod memory;
pub mod message;
pub mod orchestrator;
pub mod prompt;
pub mod session;
pub mod store;

pub use context::{ContextBuilder, DEFAULT_CONTEXT_WINDOW};
pub use error::{StoreError, TurnError};
pub use escalation::is_low_confidence;
pub use memory::InMemoryConversationStore;
pub use message::{Message, MessageId, MessageRole, NewMessage};
pub use orchestrator::{ConversationOrchestrator, OrchestratorConfig, TurnOutcome};
pub use prompt::support_prompt;
pub use session::ChatSession;
pub use store::{ConversationStore, RecordedTurn, TurnRecord};
