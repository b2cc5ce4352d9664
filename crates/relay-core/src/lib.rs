//! Core turn-taking logic for the relay.
//!
//! This crate defines the conversation store, the message normalizer, the
//! session orchestrator, and the "ports" (traits) that the infrastructure layer
//! implements for the completion engine and the messaging platform. It depends
//! only on `relay-types` -- never on `relay-infra` or any HTTP crate.

pub mod conversation;
pub mod llm;
pub mod normalize;
pub mod orchestrator;
pub mod platform;
