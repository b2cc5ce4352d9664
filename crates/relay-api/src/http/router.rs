//! Axum router configuration with middleware.
//!
//! Routes: the LINE webhook at the configured path and `GET /health`.
//! Middleware: request tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the router with all routes and middleware.
pub fn build_router(state: AppState, webhook_path: &str) -> Router {
    Router::new()
        .route(webhook_path, post(handlers::webhook::receive_webhook))
        .route("/health", get(handlers::health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
