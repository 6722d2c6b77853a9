use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health: liveness probe, reports how many streams are open.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "clients": state.hub.client_count(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
