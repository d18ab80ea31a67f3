//! Bounded conversation transcripts.
//!
//! The window is a message count, not a character or token budget. Message
//! text is never truncated, so a handful of very long messages can still
//! produce a very large prompt.

use crate::error::StoreError;
use crate::message::{Message, MessageRole, NewMessage};
use crate::store::ConversationStore;
use support_relay_core::ChatSessionId;

/// Number of messages included in a prompt unless configured otherwise.
pub const DEFAULT_CONTEXT_WINDOW: usize = 8;

/// Renders the most recent messages of a session as a prompt transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextBuilder {
    window: usize,
}

impl ContextBuilder {
    /// Creates a builder that includes at most `window` messages.
    #[must_use]
    pub const fn new(window: usize) -> Self {
        Self { window }
    }

    /// Returns the window size.
    #[must_use]
    pub const fn window(&self) -> usize {
        self.window
    }

    /// Builds the transcript of the session's stored messages.
    ///
    /// Returns an empty string for a session without messages.
    pub async fn build(
        &self,
        store: &dyn ConversationStore,
        session_id: ChatSessionId,
    ) -> Result<String, StoreError> {
        let mut recent = store.recent_messages(session_id, self.window).await?;
        recent.reverse();
        Ok(Self::render(&recent))
    }

    /// Builds the transcript as it will look once `pending` is stored.
    ///
    /// `pending` takes the last slot of the window, so it is always the
    /// final line.
    pub async fn build_with_pending(
        &self,
        store: &dyn ConversationStore,
        session_id: ChatSessionId,
        pending: &NewMessage,
    ) -> Result<String, StoreError> {
        if self.window == 0 {
            return Ok(String::new());
        }

        let mut recent = store.recent_messages(session_id, self.window - 1).await?;
        recent.reverse();

        let mut transcript = Self::render(&recent);
        push_line(&mut transcript, pending.role, &pending.text);
        Ok(transcript)
    }

    /// Renders messages, already in chronological order, one per line.
    #[must_use]
    pub fn render(messages: &[Message]) -> String {
        let mut transcript = String::new();
        for message in messages {
            push_line(&mut transcript, message.role, &message.text);
        }
        transcript
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_WINDOW)
    }
}

fn push_line(transcript: &mut String, role: MessageRole, text: &str) {
    transcript.push_str(role.transcript_label());
    transcript.push_str(": ");
    transcript.push_str(text);
    transcript.push('\n');
}
