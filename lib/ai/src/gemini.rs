//! Gemini backend for the Generative Language REST API.
//!
//! Issues one non-streaming `models/{model}:generateContent` call per
//! request. The reply text is the concatenation of the text parts of the
//! first candidate; a response with no text at all is an error rather than
//! an empty reply.

use crate::backend::{LlmBackend, LlmBackendConfig, LlmProvider, LlmRequest, LlmResponse, TokenUsage};
use crate::error::LlmError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Header carrying the API key. Keeps the key out of request URLs.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini implementation of [`LlmBackend`].
#[derive(Clone)]
pub struct GeminiBackend {
    client: reqwest::Client,
    config: LlmBackendConfig,
    api_key: String,
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GeminiBackend {
    /// Creates a backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidConfig`] if the configuration is not for
    /// Gemini, has no API key, or the HTTP client cannot be built.
    pub fn new(config: LlmBackendConfig) -> Result<Self, LlmError> {
        if config.provider != LlmProvider::Gemini {
            return Err(LlmError::InvalidConfig {
                reason: format!("expected provider 'gemini', got '{}'", config.provider),
            });
        }

        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| LlmError::InvalidConfig {
                reason: "missing API key".to_string(),
            })?;

        if config.model.trim().is_empty() {
            return Err(LlmError::InvalidConfig {
                reason: "missing model name".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LlmError::InvalidConfig {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    #[instrument(skip(self, request), fields(model = %self.config.model, prompt_len = request.prompt.len()))]
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = GenerateContentRequest::from_request(request);
        let url = self.endpoint();

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, endpoint = %url, "Gemini request failed");
                if e.is_timeout() {
                    LlmError::Timeout
                } else if e.is_connect() {
                    LlmError::ProviderUnavailable {
                        provider: LlmProvider::Gemini.to_string(),
                        reason: e.to_string(),
                    }
                } else {
                    LlmError::RequestFailed {
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse().ok());
            return Err(LlmError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Gemini returned an error status");
            return Err(LlmError::RequestFailed {
                reason: format!("HTTP {status}: {body}"),
            });
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::ResponseParseFailed {
                    reason: e.to_string(),
                }
            }
        })?;

        let usage = parsed.token_usage();
        let model = parsed
            .model_version
            .clone()
            .unwrap_or_else(|| self.config.model.clone());
        let content = parsed.into_text()?;

        debug!(
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "Gemini generation complete"
        );

        Ok(LlmResponse {
            content,
            usage,
            model,
        })
    }

    fn provider(&self) -> LlmProvider {
        LlmProvider::Gemini
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

impl<'a> GenerateContentRequest<'a> {
    fn from_request(request: &'a LlmRequest) -> Self {
        let generation_config = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            })
        } else {
            None
        };

        Self {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart {
                    text: &request.prompt,
                }],
            }],
            generation_config,
        }
    }
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

impl GenerateContentResponse {
    fn token_usage(&self) -> TokenUsage {
        self.usage_metadata
            .as_ref()
            .map(|usage| TokenUsage {
                input_tokens: usage.prompt_token_count,
                output_tokens: usage.candidates_token_count,
            })
            .unwrap_or_default()
    }

    fn into_text(self) -> Result<String, LlmError> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = match self.prompt_feedback.and_then(|f| f.block_reason) {
                Some(block_reason) => format!("prompt blocked: {block_reason}"),
                None => "response contained no candidates".to_string(),
            };
            return Err(LlmError::EmptyResponse { reason });
        };

        let texts: Vec<String> = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| part.text)
            .collect();

        if texts.is_empty() {
            let finish_reason = candidate
                .finish_reason
                .unwrap_or_else(|| "unknown".to_string());
            return Err(LlmError::EmptyResponse {
                reason: format!("candidate had no text parts (finish reason: {finish_reason})"),
            });
        }

        Ok(texts.concat())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GENERATE_PATH: &str = "/models/gemini-2.0-flash:generateContent";

    fn backend_for(server: &MockServer) -> GeminiBackend {
        let config = LlmBackendConfig::gemini("test-key", "gemini-2.0-flash")
            .with_base_url(server.uri())
            .with_request_timeout(Duration::from_secs(5));
        GeminiBackend::new(config).expect("valid config")
    }

    fn text_response(parts: &[&str]) -> serde_json::Value {
        let parts: Vec<_> = parts
            .iter()
            .map(|text| serde_json::json!({ "text": text }))
            .collect();
        serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": parts },
                "finishReason": "STOP"
            }],
            "usageMetadata": {
                "promptTokenCount": 42,
                "candidatesTokenCount": 9,
                "totalTokenCount": 51
            },
            "modelVersion": "gemini-2.0-flash-001"
        })
    }

    #[test]
    fn rejects_missing_api_key() {
        let mut config = LlmBackendConfig::gemini("", "gemini-2.0-flash");
        assert!(matches!(
            GeminiBackend::new(config.clone()),
            Err(LlmError::InvalidConfig { .. })
        ));

        config.api_key = None;
        assert!(matches!(
            GeminiBackend::new(config),
            Err(LlmError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let config = LlmBackendConfig::gemini("k", "gemini-2.0-flash")
            .with_base_url("http://localhost:9999/v1beta/");
        let backend = GeminiBackend::new(config).expect("valid config");
        assert_eq!(
            backend.endpoint(),
            "http://localhost:9999/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn request_body_omits_unset_generation_config() {
        let request = LlmRequest::new("Hello");
        let body = serde_json::to_value(GenerateContentRequest::from_request(&request))
            .expect("serialize");
        assert_eq!(
            body,
            serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "Hello" }] }]
            })
        );

        let request = LlmRequest::new("Hello").with_temperature(0.2);
        let body = serde_json::to_value(GenerateContentRequest::from_request(&request))
            .expect("serialize");
        assert_eq!(body["generationConfig"]["temperature"], serde_json::json!(0.2_f32));
        assert!(body["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[tokio::test]
    async fn generate_returns_concatenated_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "Say hi" }] }]
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(text_response(&["Hi there, ", "friend!"])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let response = backend_for(&server)
            .generate(&LlmRequest::new("Say hi"))
            .await
            .expect("generation succeeds");

        assert_eq!(response.content, "Hi there, friend!");
        assert_eq!(response.model, "gemini-2.0-flash-001");
        assert_eq!(
            response.usage,
            TokenUsage {
                input_tokens: 42,
                output_tokens: 9
            }
        );
    }

    #[tokio::test]
    async fn generate_preserves_surrounding_whitespace() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response(&["  padded \n"])))
            .mount(&server)
            .await;

        let response = backend_for(&server)
            .generate(&LlmRequest::new("x"))
            .await
            .expect("generation succeeds");
        assert_eq!(response.content, "  padded \n");
    }

    #[tokio::test]
    async fn blocked_prompt_is_an_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "promptFeedback": { "blockReason": "SAFETY" }
            })))
            .mount(&server)
            .await;

        let err = backend_for(&server)
            .generate(&LlmRequest::new("x"))
            .await
            .expect_err("no candidates");
        match err {
            LlmError::EmptyResponse { reason } => assert!(reason.contains("SAFETY")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn candidate_without_text_is_an_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "finishReason": "MAX_TOKENS" }]
            })))
            .mount(&server)
            .await;

        let err = backend_for(&server)
            .generate(&LlmRequest::new("x"))
            .await
            .expect_err("no text");
        match err {
            LlmError::EmptyResponse { reason } => assert!(reason.contains("MAX_TOKENS")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rate_limit_reports_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "17"))
            .mount(&server)
            .await;

        let err = backend_for(&server)
            .generate(&LlmRequest::new("x"))
            .await
            .expect_err("rate limited");
        assert_eq!(
            err,
            LlmError::RateLimited {
                retry_after_secs: Some(17)
            }
        );
    }

    #[tokio::test]
    async fn server_error_is_request_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend exploded"))
            .mount(&server)
            .await;

        let err = backend_for(&server)
            .generate(&LlmRequest::new("x"))
            .await
            .expect_err("server error");
        match err {
            LlmError::RequestFailed { reason } => {
                assert!(reason.contains("500"));
                assert!(reason.contains("backend exploded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_parse_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = backend_for(&server)
            .generate(&LlmRequest::new("x"))
            .await
            .expect_err("bad body");
        assert!(matches!(err, LlmError::ResponseParseFailed { .. }));
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(text_response(&["too late"]))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let config = LlmBackendConfig::gemini("test-key", "gemini-2.0-flash")
            .with_base_url(server.uri())
            .with_request_timeout(Duration::from_millis(100));
        let backend = GeminiBackend::new(config).expect("valid config");

        let err = backend
            .generate(&LlmRequest::new("x"))
            .await
            .expect_err("timed out");
        assert_eq!(err, LlmError::Timeout);
    }
}
