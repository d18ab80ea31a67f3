//! Error types for the conversation crate.
//!
//! - `StoreError`: failures reported by a [`ConversationStore`](crate::ConversationStore)
//! - `TurnError`: failures of a whole conversation turn, as seen by callers

use support_relay_ai::LlmError;
use support_relay_core::ChatSessionId;
use std::fmt;

/// Errors from conversation store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The referenced session does not exist.
    SessionNotFound { id: ChatSessionId },
    /// The backing store could not complete the operation.
    Unavailable { reason: String },
    /// A stored record could not be decoded.
    CorruptRecord { reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionNotFound { id } => write!(f, "session not found: {id}"),
            Self::Unavailable { reason } => {
                write!(f, "conversation store unavailable: {reason}")
            }
            Self::CorruptRecord { reason } => {
                write!(f, "corrupt conversation record: {reason}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors from handling a single conversation turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnError {
    /// The session does not exist. Nothing was recorded.
    SessionNotFound { id: ChatSessionId },
    /// The language generation provider failed or timed out. Nothing was recorded.
    Generation(LlmError),
    /// The conversation store failed.
    Persistence(StoreError),
}

impl fmt::Display for TurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionNotFound { id } => write!(f, "session not found: {id}"),
            Self::Generation(err) => write!(f, "reply generation failed: {err}"),
            Self::Persistence(err) => write!(f, "turn persistence failed: {err}"),
        }
    }
}

impl std::error::Error for TurnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SessionNotFound { .. } => None,
            Self::Generation(err) => Some(err),
            Self::Persistence(err) => Some(err),
        }
    }
}

impl From<StoreError> for TurnError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SessionNotFound { id } => Self::SessionNotFound { id },
            other => Self::Persistence(other),
        }
    }
}

impl From<LlmError> for TurnError {
    fn from(err: LlmError) -> Self {
        Self::Generation(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display() {
        let err = StoreError::Unavailable {
            reason: "database is locked".to_string(),
        };
        assert!(err.to_string().contains("database is locked"));
    }

    #[test]
    fn missing_session_from_store_is_not_found() {
        let id = ChatSessionId::new();
        let err = TurnError::from(StoreError::SessionNotFound { id });
        assert_eq!(err, TurnError::SessionNotFound { id });
    }

    #[test]
    fn other_store_errors_are_persistence() {
        let err = TurnError::from(StoreError::CorruptRecord {
            reason: "bad role".to_string(),
        });
        assert!(matches!(err, TurnError::Persistence(_)));
    }

    #[test]
    fn generation_error_keeps_source() {
        use std::error::Error as _;

        let err = TurnError::from(LlmError::Timeout);
        assert!(err.to_string().contains("timed out"));
        assert!(err.source().is_some());
    }
}
