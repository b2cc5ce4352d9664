//! Completion engine abstraction.
//!
//! The concrete HTTP gateway lives in `relay-infra`; the orchestrator only sees
//! the [`provider::CompletionProvider`] trait.

pub mod provider;
