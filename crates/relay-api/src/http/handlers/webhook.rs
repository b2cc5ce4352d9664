//! LINE webhook receiver.
//!
//! Verifies `X-Line-Signature` against the raw body, decodes the delivery and
//! runs every message event through the orchestrator. Events of one delivery
//! run concurrently; the per-user turn lock keeps same-user events in order.
//! The response is sent once every event has been answered.

use std::time::Instant;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use futures_util::future::join_all;
use secrecy::ExposeSecret;
use serde_json::{Value, json};
use uuid::Uuid;

use relay_infra::line::WebhookError;
use relay_infra::line::signature::{SIGNATURE_HEADER, verify_signature};
use relay_infra::line::webhook::parse_webhook;

use crate::http::error::AppError;
use crate::state::AppState;

/// POST {webhook_path} - Receive a LINE webhook delivery.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let start = Instant::now();
    let delivery_id = Uuid::now_v7();

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingSignature)?;

    verify_signature(
        state.channel_secret.expose_secret().as_bytes(),
        &body,
        signature,
    )?;

    let events = parse_webhook(&body)?.into_inbound_events();
    tracing::debug!(%delivery_id, events = events.len(), "webhook delivery accepted");

    let outcomes = join_all(
        events
            .iter()
            .map(|event| state.orchestrator.handle_event(event)),
    )
    .await;

    let replied = outcomes.iter().filter(|o| o.is_reply()).count();
    tracing::info!(
        %delivery_id,
        events = outcomes.len(),
        replied,
        apologized = outcomes.len() - replied,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "webhook delivery processed"
    );

    Ok(Json(json!({})))
}
