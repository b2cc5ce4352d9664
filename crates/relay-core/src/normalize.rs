//! Message normalizer: inbound payload -> canonical turn text.
//!
//! Text passes through untouched. Every other payload kind maps to a fixed Thai
//! template so the completion engine always receives plain text. Media is
//! fetched to confirm it exists and then dropped; its content is never
//! interpreted.

use relay_types::error::NormalizeError;
use relay_types::event::{MediaKind, MessagePayload};
use tracing::debug;

use crate::platform::MediaSource;

/// Template used for any payload kind the relay does not understand.
pub const UNSUPPORTED_TEMPLATE: &str = "ข้อความประเภทนี้ไม่รองรับ";

/// Text standing in for a sticker.
pub fn sticker_text(package_id: &str, sticker_id: &str) -> String {
    format!("ผู้ใช้ส่งสติกเกอร์ (แพ็คเกจ ID: {package_id}, สติกเกอร์ ID: {sticker_id})")
}

/// Acknowledgment standing in for an image, video or audio attachment.
pub fn media_ack_text(kind: MediaKind) -> String {
    format!(
        "ผู้ใช้ส่ง{}มา ฉันรับทราบและพร้อมที่จะคุยต่อเกี่ยวกับสิ่งที่คุณแชร์",
        kind.label()
    )
}

/// Convert a payload into the text recorded as the user's turn.
///
/// # Errors
///
/// Returns [`NormalizeError::MediaRetrieval`] when attached media cannot be
/// fetched. No other payload kind can fail.
pub async fn normalize<M: MediaSource>(
    media: &M,
    payload: &MessagePayload,
) -> Result<String, NormalizeError> {
    match payload {
        MessagePayload::Text { text } => Ok(text.clone()),
        MessagePayload::Sticker {
            package_id,
            sticker_id,
        } => Ok(sticker_text(package_id, sticker_id)),
        MessagePayload::Image { media_ref } => {
            acknowledge_media(media, media_ref, MediaKind::Image).await
        }
        MessagePayload::Video { media_ref } => {
            acknowledge_media(media, media_ref, MediaKind::Video).await
        }
        MessagePayload::Audio { media_ref } => {
            acknowledge_media(media, media_ref, MediaKind::Audio).await
        }
        MessagePayload::Unsupported => Ok(UNSUPPORTED_TEMPLATE.to_string()),
    }
}

async fn acknowledge_media<M: MediaSource>(
    media: &M,
    media_ref: &str,
    kind: MediaKind,
) -> Result<String, NormalizeError> {
    let bytes = media
        .fetch_media(media_ref)
        .await
        .map_err(|e| NormalizeError::MediaRetrieval {
            media_ref: media_ref.to_string(),
            reason: e.to_string(),
        })?;
    debug!(%media_ref, %kind, size = bytes.len(), "fetched media content");
    drop(bytes);

    Ok(media_ack_text(kind))
}
