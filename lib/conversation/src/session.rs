//! Chat sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use support_relay_core::ChatSessionId;

/// A single ongoing support conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    /// Unique session identifier.
    pub id: ChatSessionId,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Whether a human should follow up. Never reset once set.
    pub escalated: bool,
}

impl ChatSession {
    /// Creates a new, non-escalated session with a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: ChatSessionId::new(),
            created_at: Utc::now(),
            escalated: false,
        }
    }

    /// Marks the session as needing human follow-up.
    ///
    /// Returns true if this call changed the flag.
    pub fn escalate(&mut self) -> bool {
        let changed = !self.escalated;
        self.escalated = true;
        changed
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_creation() {
        let session = ChatSession::new();
        assert!(!session.escalated);
        assert!(session.id.to_string().starts_with("sess_"));
    }

    #[test]
    fn escalation_is_monotonic() {
        let mut session = ChatSession::new();
        assert!(session.escalate());
        assert!(session.escalated);
        assert!(!session.escalate());
        assert!(session.escalated);
    }

    #[test]
    fn sessions_get_distinct_ids() {
        assert_ne!(ChatSession::new().id, ChatSession::new().id);
    }
}
