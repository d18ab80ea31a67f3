//! Message types for conversations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use support_relay_core::ChatSessionId;

/// Store-assigned, auto-incrementing message identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(i64);

impl MessageId {
    /// Wraps a raw identifier assigned by the store.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The customer.
    User,
    /// The generated support reply.
    Bot,
}

impl MessageRole {
    /// Returns the stored representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }

    /// Parses the stored representation.
    #[must_use]
    pub fn from_str_value(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "bot" => Some(Self::Bot),
            _ => None,
        }
    }

    /// Returns the label used for this role in prompt transcripts.
    #[must_use]
    pub fn transcript_label(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Bot => "Bot",
        }
    }
}

/// A persisted message in a conversation. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Store-assigned identifier.
    pub id: MessageId,
    /// The session this message belongs to.
    pub session_id: ChatSessionId,
    /// Who sent the message.
    pub role: MessageRole,
    /// Full message text.
    pub text: String,
    /// When the message was created.
    pub created_at: DateTime<Utc>,
}

/// A message that has not been written to a store yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    /// Who sent the message.
    pub role: MessageRole,
    /// Full message text.
    pub text: String,
    /// When the message was created.
    pub created_at: DateTime<Utc>,
}

impl NewMessage {
    /// Creates a new message stamped with the current time.
    #[must_use]
    pub fn new(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User, text)
    }

    /// Creates a bot message.
    #[must_use]
    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(MessageRole::Bot, text)
    }

    /// Attaches the store-assigned identifier and owning session.
    #[must_use]
    pub fn into_message(self, id: MessageId, session_id: ChatSessionId) -> Message {
        Message {
            id,
            session_id,
            role: self.role,
            text: self.text,
            created_at: self.created_at,
        }
    }
}
