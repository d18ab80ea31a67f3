//! In-memory conversation store.
//!
//! Holds everything behind one lock, so each operation is trivially atomic.
//! Used by tests and by embedders that do not need durability.

use crate::error::StoreError;
use crate::message::{Message, MessageId, NewMessage};
use crate::session::ChatSession;
use crate::store::{ConversationStore, RecordedTurn, TurnRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use support_relay_core::ChatSessionId;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<ChatSessionId, ChatSession>,
    messages: Vec<Message>,
    next_message_id: i64,
}

impl Inner {
    fn push(&mut self, session_id: ChatSessionId, message: NewMessage) -> Message {
        self.next_message_id += 1;
        let stored = message.into_message(MessageId::new(self.next_message_id), session_id);
        self.messages.push(stored.clone());
        stored
    }
}

/// A [`ConversationStore`] kept entirely in process memory.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    inner: RwLock<Inner>,
    unavailable: AtomicBool,
}

impl InMemoryConversationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail with [`StoreError::Unavailable`]
    /// until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns the number of stored messages across all sessions.
    pub async fn total_messages(&self) -> usize {
        self.inner.read().await.messages.len()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: "store marked unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn create_session(&self) -> Result<ChatSession, StoreError> {
        self.check_available()?;
        let session = ChatSession::new();
        self.inner
            .write()
            .await
            .sessions
            .insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: ChatSessionId) -> Result<Option<ChatSession>, StoreError> {
        self.check_available()?;
        Ok(self.inner.read().await.sessions.get(&id).cloned())
    }

    async fn append_message(
        &self,
        session_id: ChatSessionId,
        message: NewMessage,
    ) -> Result<Message, StoreError> {
        self.check_available()?;
        let mut inner = self.inner.write().await;
        if !inner.sessions.contains_key(&session_id) {
            return Err(StoreError::SessionNotFound { id: session_id });
        }
        Ok(inner.push(session_id, message))
    }

    async fn recent_messages(
        &self,
        session_id: ChatSessionId,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError> {
        self.check_available()?;
        let inner = self.inner.read().await;
        let mut messages: Vec<Message> = inner
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        messages.truncate(limit);
        Ok(messages)
    }

    async fn record_turn(&self, turn: TurnRecord) -> Result<RecordedTurn, StoreError> {
        self.check_available()?;
        let mut inner = self.inner.write().await;

        let mut session = inner
            .sessions
            .get(&turn.session_id)
            .cloned()
            .ok_or(StoreError::SessionNotFound {
                id: turn.session_id,
            })?;
        if turn.escalate {
            session.escalate();
        }

        let user = inner.push(turn.session_id, turn.user);
        let bot = inner.push(turn.session_id, turn.bot);
        inner.sessions.insert(session.id, session.clone());

        Ok(RecordedTurn { user, bot, session })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageRole;

    fn turn(session_id: ChatSessionId, escalate: bool) -> TurnRecord {
        TurnRecord {
            session_id,
            user: NewMessage::user("question"),
            bot: NewMessage::bot("answer"),
            escalate,
        }
    }

    #[tokio::test]
    async fn create_and_get_session() {
        let store = InMemoryConversationStore::new();
        let session = store.create_session().await.expect("create");
        let loaded = store.get_session(session.id).await.expect("get");
        assert_eq!(loaded, Some(session));
        assert_eq!(
            store.get_session(ChatSessionId::new()).await.expect("get"),
            None
        );
    }

    #[tokio::test]
    async fn append_to_unknown_session_writes_nothing() {
        let store = InMemoryConversationStore::new();
        let err = store
            .append_message(ChatSessionId::new(), NewMessage::user("hi"))
            .await
            .expect_err("unknown session");
        assert!(matches!(err, StoreError::SessionNotFound { .. }));
        assert_eq!(store.total_messages().await, 0);
    }

    #[tokio::test]
    async fn recent_messages_are_newest_first_and_bounded() {
        let store = InMemoryConversationStore::new();
        let session = store.create_session().await.expect("create");
        for i in 0..5 {
            store
                .append_message(session.id, NewMessage::user(format!("m{i}")))
                .await
                .expect("append");
        }

        let recent = store.recent_messages(session.id, 3).await.expect("recent");
        let texts: Vec<_> = recent.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["m4", "m3", "m2"]);
    }

    #[tokio::test]
    async fn record_turn_appends_both_messages_in_order() {
        let store = InMemoryConversationStore::new();
        let session = store.create_session().await.expect("create");

        let recorded = store.record_turn(turn(session.id, false)).await.expect("record");
        assert!(recorded.user.id < recorded.bot.id);
        assert!(!recorded.session.escalated);

        let recent = store.recent_messages(session.id, 10).await.expect("recent");
        let roles: Vec<_> = recent.iter().rev().map(|m| m.role).collect();
        assert_eq!(roles, [MessageRole::User, MessageRole::Bot]);
    }

    #[tokio::test]
    async fn record_turn_escalation_never_resets() {
        let store = InMemoryConversationStore::new();
        let session = store.create_session().await.expect("create");

        store.record_turn(turn(session.id, true)).await.expect("record");
        let recorded = store.record_turn(turn(session.id, false)).await.expect("record");
        assert!(recorded.session.escalated);

        let loaded = store.get_session(session.id).await.expect("get").expect("exists");
        assert!(loaded.escalated);
    }

    #[tokio::test]
    async fn record_turn_for_unknown_session_writes_nothing() {
        let store = InMemoryConversationStore::new();
        let err = store
            .record_turn(turn(ChatSessionId::new(), true))
            .await
            .expect_err("unknown session");
        assert!(matches!(err, StoreError::SessionNotFound { .. }));
        assert_eq!(store.total_messages().await, 0);
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_operation() {
        let store = InMemoryConversationStore::new();
        let session = store.create_session().await.expect("create");
        store.set_unavailable(true);

        assert!(matches!(
            store.get_session(session.id).await,
            Err(StoreError::Unavailable { .. })
        ));
        assert!(matches!(
            store.record_turn(turn(session.id, false)).await,
            Err(StoreError::Unavailable { .. })
        ));

        store.set_unavailable(false);
        assert!(store.get_session(session.id).await.is_ok());
    }
}
