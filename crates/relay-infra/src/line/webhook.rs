//! LINE webhook payload types.
//!
//! Only the parts the relay acts on are modelled. Event and message types the
//! relay does not know collapse into catch-all variants instead of failing the
//! whole delivery.

use serde::Deserialize;
use tracing::debug;

use relay_types::event::{InboundEvent, MessagePayload};

use super::WebhookError;

/// Top-level webhook request body.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

/// A single webhook event.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum WebhookEvent {
    #[serde(rename = "message")]
    Message {
        #[serde(rename = "replyToken", default)]
        reply_token: Option<String>,
        source: EventSource,
        message: LineMessage,
    },
    /// follow, unfollow, postback, join, ... -- ignored by the relay.
    #[serde(other)]
    Other,
}

/// Where an event came from.
#[derive(Debug, Clone, Deserialize)]
pub struct EventSource {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
}

/// Message object of a `message` event.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LineMessage {
    Text {
        id: String,
        text: String,
    },
    Sticker {
        id: String,
        #[serde(rename = "packageId")]
        package_id: String,
        #[serde(rename = "stickerId")]
        sticker_id: String,
    },
    Image {
        id: String,
    },
    Video {
        id: String,
    },
    Audio {
        id: String,
    },
    /// file, location, and anything LINE adds later.
    #[serde(other)]
    Unsupported,
}

impl From<LineMessage> for MessagePayload {
    fn from(message: LineMessage) -> Self {
        match message {
            LineMessage::Text { text, .. } => MessagePayload::Text { text },
            LineMessage::Sticker {
                package_id,
                sticker_id,
                ..
            } => MessagePayload::Sticker {
                package_id,
                sticker_id,
            },
            LineMessage::Image { id } => MessagePayload::Image { media_ref: id },
            LineMessage::Video { id } => MessagePayload::Video { media_ref: id },
            LineMessage::Audio { id } => MessagePayload::Audio { media_ref: id },
            LineMessage::Unsupported => MessagePayload::Unsupported,
        }
    }
}

/// Decode a raw webhook body.
pub fn parse_webhook(body: &[u8]) -> Result<WebhookBody, WebhookError> {
    serde_json::from_slice(body).map_err(|e| WebhookError::MalformedBody(e.to_string()))
}

impl WebhookBody {
    /// Message events the relay should answer, in delivery order.
    ///
    /// Non-message events and events without a user id or reply token are
    /// dropped.
    pub fn into_inbound_events(self) -> Vec<InboundEvent> {
        self.events
            .into_iter()
            .filter_map(|event| match event {
                WebhookEvent::Message {
                    reply_token,
                    source,
                    message,
                } => {
                    let Some(user_id) = source.user_id else {
                        debug!(source = %source.kind, "ignoring message event without user id");
                        return None;
                    };
                    let Some(reply_token) = reply_token else {
                        debug!(%user_id, "ignoring message event without reply token");
                        return None;
                    };
                    Some(InboundEvent {
                        user_id,
                        reply_token,
                        payload: message.into(),
                    })
                }
                WebhookEvent::Other => {
                    debug!("ignoring non-message event");
                    None
                }
            })
            .collect()
    }
}
