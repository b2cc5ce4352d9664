//! GET /health - liveness probe with the number of live conversations.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "conversations": state.orchestrator.store().len(),
    }))
}
