//! Shared domain types for the conversation relay.
//!
//! This crate contains the types used across the relay: conversation turns,
//! inbound platform events, configuration, and the error taxonomy for each
//! seam between the core and its collaborators.
//!
//! Zero infrastructure dependencies -- only serde and thiserror.

pub mod config;
pub mod error;
pub mod event;
pub mod turn;
