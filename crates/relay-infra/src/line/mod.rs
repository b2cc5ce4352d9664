//! LINE Messaging API adapter.
//!
//! Provides:
//! - [`signature`] -- `X-Line-Signature` HMAC-SHA256 verification
//! - [`webhook`] -- webhook body decoding into platform-neutral events
//! - [`client::LineClient`] -- media retrieval and reply delivery

pub mod client;
pub mod signature;
pub mod webhook;

pub use client::LineClient;

/// Errors that can occur while accepting a webhook delivery.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The signature header is absent.
    #[error("missing X-Line-Signature header")]
    MissingSignature,

    /// The signature does not match the body.
    #[error("signature verification failed")]
    InvalidSignature,

    /// The channel secret cannot be used as an HMAC key.
    #[error("invalid HMAC key: {0}")]
    InvalidKey(String),

    /// The body is not a valid webhook payload.
    #[error("malformed webhook body: {0}")]
    MalformedBody(String),
}
