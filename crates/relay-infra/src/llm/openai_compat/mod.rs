//! OpenAI-compatible completion gateway.
//!
//! Sends the full conversation history to a `/chat/completions` endpoint with
//! the fixed generation parameters from configuration, and decodes the reply
//! strictly: anything other than a non-empty first choice with text content is
//! a [`CompletionError`], never a guessed reply.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

pub mod types;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use relay_core::llm::provider::CompletionProvider;
use relay_types::config::CompletionConfig;
use relay_types::error::CompletionError;
use relay_types::turn::Turn;

use self::types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};

/// Gateway to an OpenAI-compatible chat completions API.
///
/// # API Key Security
///
/// The API key is stored as a [`SecretString`] and is only exposed when
/// constructing the `Authorization` header.
pub struct OpenAiCompatGateway {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    top_p: f64,
    frequency_penalty: f64,
    presence_penalty: f64,
    timeout: Duration,
}

impl OpenAiCompatGateway {
    /// Create a gateway from the completion section of the configuration.
    pub fn new(client: reqwest::Client, api_key: SecretString, config: &CompletionConfig) -> Self {
        Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            top_p: config.top_p,
            frequency_penalty: config.frequency_penalty,
            presence_penalty: config.presence_penalty,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request<'a>(&'a self, history: &'a [Turn]) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages: history
                .iter()
                .map(|t| ChatMessage {
                    role: t.role(),
                    content: t.content(),
                })
                .collect(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
            frequency_penalty: self.frequency_penalty,
            presence_penalty: self.presence_penalty,
        }
    }

    fn map_reqwest_error(&self, err: reqwest::Error) -> CompletionError {
        if err.is_timeout() {
            CompletionError::Timeout(self.timeout)
        } else {
            CompletionError::Transport(err.to_string())
        }
    }
}

// Intentionally does NOT derive Debug: the struct holds the API key.

impl CompletionProvider for OpenAiCompatGateway {
    fn name(&self) -> &str {
        "openai_compatible"
    }

    async fn complete(&self, history: &[Turn]) -> Result<String, CompletionError> {
        let body = self.build_request(history);

        let response = self
            .client
            .post(self.url())
            .bearer_auth(self.api_key.expose_secret())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        extract_reply(&bytes)
    }
}

/// Decode a response body and pull out the first choice's text.
fn extract_reply(body: &[u8]) -> Result<String, CompletionError> {
    let decoded: ChatCompletionResponse = serde_json::from_slice(body)
        .map_err(|e| CompletionError::Protocol(format!("failed to decode response: {e}")))?;

    let choice = decoded
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CompletionError::Protocol("response has no choices".to_string()))?;

    match choice.message.content {
        Some(text) if !text.trim().is_empty() => Ok(text),
        Some(_) => Err(CompletionError::Protocol(
            "first choice has empty content".to_string(),
        )),
        None => Err(CompletionError::Protocol(
            "first choice has no message content".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn gateway(base_url: &str) -> OpenAiCompatGateway {
        let config = CompletionConfig {
            base_url: base_url.to_string(),
            ..CompletionConfig::default()
        };
        OpenAiCompatGateway::new(
            reqwest::Client::new(),
            SecretString::from("sk-test-not-real"),
            &config,
        )
    }

    fn history() -> Vec<Turn> {
        vec![Turn::system("persona"), Turn::user("ปวดหัว")]
    }

    #[test]
    fn test_build_request_carries_history_in_order() {
        let gw = gateway("https://api.openai.com/v1/");
        let turns = history();
        let request = gw.build_request(&turns);
        assert_eq!(request.model, "gpt-4o");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].content, "persona");
        assert_eq!(request.messages[1].content, "ปวดหัว");
        assert_eq!(request.max_tokens, 250);
        assert_eq!(gw.url(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn test_extract_reply_variants() {
        let ok = br#"{"choices":[{"message":{"content":"hello"}}]}"#;
        assert_eq!(extract_reply(ok).unwrap(), "hello");

        let empty = br#"{"choices":[]}"#;
        assert!(matches!(extract_reply(empty), Err(CompletionError::Protocol(_))));

        let blank = br#"{"choices":[{"message":{"content":"  "}}]}"#;
        assert!(matches!(extract_reply(blank), Err(CompletionError::Protocol(_))));

        let missing = br#"{"choices":[{"message":{}}]}"#;
        assert!(matches!(extract_reply(missing), Err(CompletionError::Protocol(_))));

        let not_json = b"<html>bad gateway</html>";
        assert!(matches!(extract_reply(not_json), Err(CompletionError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_complete_sends_expected_request() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer sk-test-not-real")
                .json_body_includes(
                    json!({
                        "model": "gpt-4o",
                        "messages": [
                            {"role": "system", "content": "persona"},
                            {"role": "user", "content": "ปวดหัว"}
                        ],
                        "max_tokens": 250
                    })
                    .to_string(),
                );
            then.status(200).json_body(json!({
                "id": "chatcmpl-1",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "ลองนอนพักดูนะครับ"},
                    "finish_reason": "stop"
                }]
            }));
        });

        let gw = gateway(&format!("{}/v1", server.base_url()));
        let reply = gw.complete(&history()).await.unwrap();

        mock.assert();
        assert_eq!(reply, "ลองนอนพักดูนะครับ");
    }

    #[tokio::test]
    async fn test_zero_choices_is_protocol_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(json!({"choices": []}));
        });

        let gw = gateway(&format!("{}/v1", server.base_url()));
        let err = gw.complete(&history()).await.unwrap_err();
        assert!(matches!(err, CompletionError::Protocol(_)));
        assert!(!err.is_transport());
    }

    #[tokio::test]
    async fn test_non_success_status_is_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(429)
                .json_body(json!({"error": {"message": "Rate limit reached"}}));
        });

        let gw = gateway(&format!("{}/v1", server.base_url()));
        match gw.complete(&history()).await {
            Err(CompletionError::Status { status, body }) => {
                assert_eq!(status, 429);
                assert!(body.contains("Rate limit"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_slow_engine_times_out() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200)
                .delay(Duration::from_millis(300))
                .json_body(json!({"choices": [{"message": {"content": "late"}}]}));
        });

        let gw = gateway(&format!("{}/v1", server.base_url()))
            .with_timeout(Duration::from_millis(50));
        let err = gw.complete(&history()).await.unwrap_err();
        assert!(matches!(err, CompletionError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_unreachable_engine_is_transport_failure() {
        // Port 9 (discard) is closed on CI hosts.
        let gw = gateway("http://127.0.0.1:9/v1").with_timeout(Duration::from_secs(2));
        let err = gw.complete(&history()).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_exactly_one_attempt_per_call() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(503).body("upstream unavailable");
        });

        let gw = gateway(&format!("{}/v1", server.base_url()));
        assert!(gw.complete(&history()).await.is_err());
        mock.assert_calls(1);
    }
}
