//! Health check handler.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::state::AppState;

/// GET /api/health — liveness plus realtime counters.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let metrics = state.realtime.metrics.snapshot();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "connections": metrics.connections_current,
        "online_users": state.realtime.presence.online_count(),
    }))
}
