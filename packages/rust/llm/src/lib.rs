//! Language model client for ReportWeaver.
//!
//! Talks to an OpenAI-compatible chat-completions endpoint (OpenRouter by
//! default). The model is treated as an opaque text-in/text-out capability:
//! one user message per call, first choice's content returned, no streaming.
//!
//! The [`LanguageModel`] trait is the seam the synthesis stages are generic
//! over, so tests can substitute a scripted fake for the HTTP client.

pub mod prompt;

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use reportweaver_shared::{ReportWeaverError, Result};

/// OpenRouter chat-completions endpoint.
const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Per-request timeout for model calls in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// How many characters of an error response body are kept in the error message.
const ERROR_BODY_CHARS: usize = 200;

// ---------------------------------------------------------------------------
// LanguageModel trait
// ---------------------------------------------------------------------------

/// An opaque text-in/text-out generative capability.
pub trait LanguageModel {
    /// Issue one free-text instruction and return the model's response text.
    fn complete(&self, instruction: &str) -> impl Future<Output = Result<String>> + Send;
}

impl<T: LanguageModel + Sync> LanguageModel for &T {
    fn complete(&self, instruction: &str) -> impl Future<Output = Result<String>> + Send {
        (**self).complete(instruction)
    }
}

// ---------------------------------------------------------------------------
// Wire types (OpenAI-compatible chat completions)
// ---------------------------------------------------------------------------

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Request body for a chat-completions call.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

/// One completion choice in the response.
#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Response body of a chat-completions call.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

// ---------------------------------------------------------------------------
// OpenRouterClient
// ---------------------------------------------------------------------------

/// Chat-completions client against OpenRouter.
pub struct OpenRouterClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenRouterClient {
    /// Create a new client for the given API key and model id.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ReportWeaverError::Llm(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: OPENROUTER_ENDPOINT.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// The model id this client sends with every request.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Point the client at a different endpoint (for tests with mock servers).
    #[cfg(test)]
    fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl LanguageModel for OpenRouterClient {
    #[instrument(skip_all, fields(model = %self.model, chars = instruction.len()))]
    async fn complete(&self, instruction: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".into(),
                content: instruction.into(),
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ReportWeaverError::Llm(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportWeaverError::Llm(format!(
                "HTTP {status}: {}",
                truncate(&body, ERROR_BODY_CHARS)
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ReportWeaverError::Llm(format!("invalid response body: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ReportWeaverError::Llm("response contained no choices".into()))?;

        debug!(chars = content.len(), "model call complete");
        Ok(content)
    }
}

/// Keep the first `max_chars` characters of a string.
fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_with_user_message() {
        let request = ChatRequest {
            model: "moonshotai/kimi-k2.5".into(),
            messages: vec![ChatMessage {
                role: "user".into(),
                content: "Summarize this content: hello".into(),
            }],
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""model":"moonshotai/kimi-k2.5""#));
        assert!(json.contains(r#""role":"user""#));
        assert!(json.contains("Summarize this content: hello"));
    }

    #[test]
    fn response_deserializes_first_choice() {
        let json = r#"{
            "id": "gen-123",
            "choices": [
                {"message": {"role": "assistant", "content": "a summary"}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.choices.len(), 1);
        assert_eq!(parsed.choices[0].message.content, "a summary");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "é".repeat(300);
        assert_eq!(truncate(&s, 200).chars().count(), 200);
        assert_eq!(truncate("short", 200), "short");
    }

    fn client_for(server: &wiremock::MockServer) -> OpenRouterClient {
        OpenRouterClient::new("test-key", "test/model")
            .unwrap()
            .with_endpoint(format!("{}/api/v1/chat/completions", server.uri()))
    }

    #[tokio::test]
    async fn complete_returns_message_content() {
        let server = wiremock::MockServer::start().await;
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "the answer"}}]
        });
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/api/v1/chat/completions"))
            .and(wiremock::matchers::header("authorization", "Bearer test-key"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client.complete("say something").await.unwrap();
        assert_eq!(result, "the answer");
    }

    #[tokio::test]
    async fn complete_sends_configured_model_and_prompt() {
        let server = wiremock::MockServer::start().await;
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "ok"}}]
        });
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::body_partial_json(serde_json::json!({
                "model": "test/model",
                "messages": [{"role": "user", "content": "the instruction"}]
            })))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.complete("the instruction").await.unwrap();
    }

    #[tokio::test]
    async fn non_success_status_propagates_as_llm_error() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(
                wiremock::ResponseTemplate::new(429).set_body_string("rate limited"),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.complete("anything").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("429"), "got: {msg}");
        assert!(msg.contains("rate limited"), "got: {msg}");
    }

    #[tokio::test]
    async fn empty_choices_propagates_as_llm_error() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.complete("anything").await.unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }
}
