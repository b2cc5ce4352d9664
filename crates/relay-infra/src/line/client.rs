//! LineClient -- HTTP client for the LINE Messaging API.
//!
//! Implements [`MediaSource`] (message content download) and [`ReplySink`]
//! (reply API) for the orchestrator. The channel access token is wrapped in
//! [`SecretString`] and only exposed when building the `Authorization` header.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use relay_core::platform::{MediaSource, ReplySink};
use relay_types::config::LineConfig;
use relay_types::error::DeliveryError;

/// LINE caps a single text message at 5000 characters.
const MAX_TEXT_CHARS: usize = 5000;

#[derive(Debug, Serialize)]
struct ReplyRequest<'a> {
    #[serde(rename = "replyToken")]
    reply_token: &'a str,
    messages: Vec<TextMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

/// LINE Messaging API client.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct LineClient {
    client: reqwest::Client,
    channel_token: SecretString,
    api_base: String,
    data_api_base: String,
}

impl LineClient {
    pub fn new(client: reqwest::Client, channel_token: SecretString, config: &LineConfig) -> Self {
        Self {
            client,
            channel_token,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            data_api_base: config.data_api_base.trim_end_matches('/').to_string(),
        }
    }

    fn reply_url(&self) -> String {
        format!("{}/v2/bot/message/reply", self.api_base)
    }

    fn content_url(&self, message_id: &str) -> String {
        format!("{}/v2/bot/message/{message_id}/content", self.data_api_base)
    }
}

// Intentionally does NOT derive Debug: the struct holds the channel token.

impl MediaSource for LineClient {
    async fn fetch_media(&self, media_ref: &str) -> Result<Vec<u8>, DeliveryError> {
        let response = self
            .client
            .get(self.content_url(media_ref))
            .bearer_auth(self.channel_token.expose_secret())
            .send()
            .await
            .map_err(|e| DeliveryError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DeliveryError::Request(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

impl ReplySink for LineClient {
    async fn send_reply(&self, reply_token: &str, text: &str) -> Result<(), DeliveryError> {
        let text = truncate_chars(text, MAX_TEXT_CHARS);
        let body = ReplyRequest {
            reply_token,
            messages: vec![TextMessage { kind: "text", text }],
        };

        let response = self
            .client
            .post(self.reply_url())
            .bearer_auth(self.channel_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| DeliveryError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Cut `text` to at most `max` characters on a char boundary.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
