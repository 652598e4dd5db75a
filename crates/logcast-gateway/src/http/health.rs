use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health: liveness probe, returns server metadata and pipeline counters.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "commit": env!("LOGCAST_GIT_SHA"),
        "subscribers": state.registry.len(),
        "ingested": state.stats.ingested(),
        "persist_failures": state.stats.persist_failures(),
    }))
}
