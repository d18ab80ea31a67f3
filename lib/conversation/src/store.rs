//! Conversation storage interface.

use crate::error::StoreError;
use crate::message::{Message, NewMessage};
use crate::session::ChatSession;
use async_trait::async_trait;
use support_relay_core::ChatSessionId;

/// Everything one completed turn writes.
#[derive(Debug, Clone)]
pub struct TurnRecord {
    /// The session the turn belongs to.
    pub session_id: ChatSessionId,
    /// The inbound customer message.
    pub user: NewMessage,
    /// The generated reply.
    pub bot: NewMessage,
    /// Whether the reply should escalate the session.
    pub escalate: bool,
}

/// What a store wrote for a turn.
#[derive(Debug, Clone)]
pub struct RecordedTurn {
    /// The stored customer message.
    pub user: Message,
    /// The stored reply.
    pub bot: Message,
    /// The session after the turn was applied.
    pub session: ChatSession,
}

/// Trait for conversation storage.
///
/// Implementations must keep messages append-only, never reset
/// `ChatSession::escalated`, and never return messages of another session.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Creates and stores a new session.
    async fn create_session(&self) -> Result<ChatSession, StoreError>;

    /// Gets a session by ID.
    async fn get_session(&self, id: ChatSessionId) -> Result<Option<ChatSession>, StoreError>;

    /// Appends a single message to an existing session.
    ///
    /// Fails with [`StoreError::SessionNotFound`] without writing anything
    /// if the session does not exist.
    async fn append_message(
        &self,
        session_id: ChatSessionId,
        message: NewMessage,
    ) -> Result<Message, StoreError>;

    /// Returns up to `limit` of the session's most recent messages,
    /// newest first.
    async fn recent_messages(
        &self,
        session_id: ChatSessionId,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError>;

    /// Atomically appends both messages of a turn and, if requested,
    /// escalates the session.
    ///
    /// Either every write of the turn is applied or none is.
    async fn record_turn(&self, turn: TurnRecord) -> Result<RecordedTurn, StoreError>;
}
