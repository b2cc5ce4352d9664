use std::time::Duration;

use thiserror::Error;

/// Errors turning an inbound payload into turn text.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("media retrieval failed for '{media_ref}': {reason}")]
    MediaRetrieval { media_ref: String, reason: String },
}

/// Errors from a single completion engine call.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("completion request timed out after {0:?}")]
    Timeout(Duration),

    #[error("completion engine returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response format: {0}")]
    Protocol(String),
}

impl CompletionError {
    /// Whether the failure happened before a well-formed response was received.
    pub fn is_transport(&self) -> bool {
        !matches!(self, CompletionError::Protocol(_))
    }
}

/// Errors delivering a reply or fetching content from the messaging platform.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("platform request failed: {0}")]
    Request(String),

    #[error("platform returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse config file '{path}': {reason}")]
    Parse { path: String, reason: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),
}
