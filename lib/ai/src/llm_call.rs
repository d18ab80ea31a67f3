//! LLM Call primitive.
//!
//! Single-shot inference bounded by a deadline. The deadline is enforced
//! around the whole backend future, so a provider that hangs after the
//! response headers arrive is cut off as well.

use crate::backend::{LlmBackend, LlmRequest, LlmResponse, TokenUsage};
use crate::error::LlmError;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use ulid::Ulid;

/// Default deadline for a single call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Unique identifier for an LLM invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LlmInvocationId(Ulid);

impl LlmInvocationId {
    /// Creates a new invocation ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for LlmInvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LlmInvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "llm_{}", self.0)
    }
}

/// The result of an LLM Call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmCallResult {
    /// Unique identifier for this invocation.
    pub id: LlmInvocationId,
    /// The raw text output.
    pub content: String,
    /// Token usage statistics.
    pub usage: TokenUsage,
    /// Model that generated the response.
    pub model: String,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

impl LlmCallResult {
    /// Creates a result from an LLM response.
    #[must_use]
    pub fn from_response(response: LlmResponse, latency_ms: u64) -> Self {
        Self {
            id: LlmInvocationId::new(),
            content: response.content,
            usage: response.usage,
            model: response.model,
            latency_ms,
        }
    }
}

/// An LLM Call executor.
#[derive(Debug, Clone)]
pub struct LlmCall {
    request: LlmRequest,
    timeout: Duration,
}

impl LlmCall {
    /// Creates a new LLM Call with the given prompt.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            request: LlmRequest::new(prompt),
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.request = self.request.with_temperature(temperature);
        self
    }

    /// Sets the maximum number of generated tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.request = self.request.with_max_tokens(max_tokens);
        self
    }

    /// Sets the deadline for the whole call.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the request that will be sent.
    #[must_use]
    pub fn request(&self) -> &LlmRequest {
        &self.request
    }

    /// Returns the call deadline.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs the call against a backend.
    ///
    /// Dropping the backend future on expiry is the only cancellation point;
    /// no retry is attempted.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Timeout`] if the deadline passes, otherwise
    /// whatever the backend reports.
    pub async fn execute(&self, backend: &dyn LlmBackend) -> Result<LlmCallResult, LlmError> {
        let started = Instant::now();
        let response = tokio::time::timeout(self.timeout, backend.generate(&self.request))
            .await
            .map_err(|_| LlmError::Timeout)??;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok(LlmCallResult::from_response(response, latency_ms))
    }
}
