//! Platform-neutral inbound event types.
//!
//! The webhook adapter translates whatever the messaging platform delivers into
//! an [`InboundEvent`]. The payload is a closed sum type: adding a new platform
//! message kind means adding a variant here, and every `match` over it in the
//! core stops compiling until the new kind is handled.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One inbound message event addressed to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Stable per-platform identifier of the sender.
    pub user_id: String,
    /// Opaque token used once to answer this event.
    pub reply_token: String,
    pub payload: MessagePayload,
}

/// The message carried by an inbound event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePayload {
    Text {
        text: String,
    },
    Sticker {
        package_id: String,
        sticker_id: String,
    },
    Image {
        media_ref: String,
    },
    Video {
        media_ref: String,
    },
    Audio {
        media_ref: String,
    },
    Unsupported,
}

impl MessagePayload {
    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            MessagePayload::Text { .. } => "text",
            MessagePayload::Sticker { .. } => "sticker",
            MessagePayload::Image { .. } => "image",
            MessagePayload::Video { .. } => "video",
            MessagePayload::Audio { .. } => "audio",
            MessagePayload::Unsupported => "unsupported",
        }
    }
}

/// Kinds of attached media whose content lives on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    /// Thai noun used in the acknowledgment template.
    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Image => "รูปภาพ",
            MediaKind::Video => "วิดีโอ",
            MediaKind::Audio => "ข้อความเสียง",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
        }
    }
}
