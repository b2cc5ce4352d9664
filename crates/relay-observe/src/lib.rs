//! Observability setup for the relay: structured logging and optional
//! OpenTelemetry span export.

pub mod tracing_setup;

pub use tracing_setup::{LogFormat, init_tracing, shutdown_tracing};
