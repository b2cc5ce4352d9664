//! Completion engine implementations.
//!
//! Contains concrete implementations of the [`CompletionProvider`] trait
//! defined in `relay-core`.
//!
//! [`CompletionProvider`]: relay_core::llm::provider::CompletionProvider

pub mod openai_compat;
