//! Conversation turn orchestration.
//!
//! A turn is staged in memory until the reply exists: the session is checked
//! first, the transcript is built as if the user message were already
//! stored, and only after generation succeeds are the user message, the
//! reply and the escalation flag committed through one
//! [`ConversationStore::record_turn`] call. A failed turn therefore leaves
//! the log untouched.
//!
//! Turns on the same session are not serialized against each other; two
//! concurrent turns may interleave their messages.

use crate::context::{ContextBuilder, DEFAULT_CONTEXT_WINDOW};
use crate::error::{StoreError, TurnError};
use crate::escalation::is_low_confidence;
use crate::message::NewMessage;
use crate::prompt::support_prompt;
use crate::session::ChatSession;
use crate::store::{ConversationStore, TurnRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use support_relay_ai::{LlmBackend, LlmCall};
use support_relay_core::{ChatSessionId, TurnId};
use tracing::{info, instrument, warn};

/// Orchestrator settings, fixed at construction.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Number of messages included in each prompt.
    pub context_window: usize,
    /// Deadline for one generation call.
    pub generation_timeout: Duration,
    /// Sampling temperature, if overriding the provider default.
    pub temperature: Option<f32>,
    /// Cap on generated tokens, if overriding the provider default.
    pub max_output_tokens: Option<u32>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            context_window: DEFAULT_CONTEXT_WINDOW,
            generation_timeout: Duration::from_secs(30),
            temperature: None,
            max_output_tokens: None,
        }
    }
}

/// The result of a successful turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// The trimmed generated reply.
    pub reply: String,
    /// Whether this reply was judged low confidence.
    pub escalated: bool,
}

/// Runs conversation turns against a store and a generation backend.
pub struct ConversationOrchestrator {
    store: Arc<dyn ConversationStore>,
    backend: Arc<dyn LlmBackend>,
    context: ContextBuilder,
    config: OrchestratorConfig,
}

impl ConversationOrchestrator {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(
        store: Arc<dyn ConversationStore>,
        backend: Arc<dyn LlmBackend>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            backend,
            context: ContextBuilder::new(config.context_window),
            config,
        }
    }

    /// Starts a new conversation.
    #[instrument(skip(self))]
    pub async fn start_session(&self) -> Result<ChatSession, StoreError> {
        let session = self.store.create_session().await?;
        info!(session_id = %session.id, "Started chat session");
        Ok(session)
    }

    /// Handles one user message and returns the generated reply.
    ///
    /// # Errors
    ///
    /// - [`TurnError::SessionNotFound`] if the session does not exist
    /// - [`TurnError::Generation`] if the provider fails or times out
    /// - [`TurnError::Persistence`] if the store fails
    ///
    /// No message is recorded when an error is returned.
    #[instrument(
        skip(self, message_text),
        fields(turn_id = %TurnId::new(), message_len = message_text.len())
    )]
    pub async fn handle_turn(
        &self,
        session_id: ChatSessionId,
        message_text: &str,
    ) -> Result<TurnOutcome, TurnError> {
        let session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or(TurnError::SessionNotFound { id: session_id })?;

        let user_message = NewMessage::user(message_text);
        let context = self
            .context
            .build_with_pending(self.store.as_ref(), session_id, &user_message)
            .await?;
        let prompt = support_prompt(&context, message_text);

        let mut call = LlmCall::new(prompt).with_timeout(self.config.generation_timeout);
        if let Some(temperature) = self.config.temperature {
            call = call.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.config.max_output_tokens {
            call = call.with_max_tokens(max_tokens);
        }

        let result = call.execute(self.backend.as_ref()).await.map_err(|e| {
            warn!(
                error = %e,
                provider = %self.backend.provider(),
                model = self.backend.model(),
                "Reply generation failed"
            );
            TurnError::Generation(e)
        })?;

        let reply = result.content.trim().to_string();
        let low_confidence = is_low_confidence(&reply);

        info!(
            invocation_id = %result.id,
            model = %result.model,
            latency_ms = result.latency_ms,
            input_tokens = result.usage.input_tokens,
            output_tokens = result.usage.output_tokens,
            low_confidence,
            "Generated reply"
        );

        let recorded = self
            .store
            .record_turn(TurnRecord {
                session_id,
                user: user_message,
                bot: NewMessage::bot(reply.clone()),
                escalate: low_confidence,
            })
            .await?;

        if recorded.session.escalated && !session.escalated {
            info!("Session escalated for human follow-up");
        }

        Ok(TurnOutcome {
            reply,
            escalated: low_confidence,
        })
    }
}
