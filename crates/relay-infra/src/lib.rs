//! Infrastructure layer for the relay.
//!
//! Contains implementations of the traits defined in `relay-core`: the
//! OpenAI-compatible completion gateway, the LINE Messaging API client
//! (media retrieval, reply delivery, webhook signature and payload parsing),
//! and configuration loading.

pub mod config;
pub mod line;
pub mod llm;
