//! Messaging platform ports.
//!
//! The normalizer needs to pull attached media; the orchestrator needs to send
//! replies. Both are side effects owned by the platform adapter in relay-infra.

use relay_types::error::DeliveryError;

/// Retrieves the content behind a media reference.
pub trait MediaSource: Send + Sync {
    /// Fetch the raw bytes of a message attachment.
    fn fetch_media(
        &self,
        media_ref: &str,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, DeliveryError>> + Send;
}

/// Delivers a text reply to the user behind a reply token.
pub trait ReplySink: Send + Sync {
    fn send_reply(
        &self,
        reply_token: &str,
        text: &str,
    ) -> impl std::future::Future<Output = Result<(), DeliveryError>> + Send;
}
