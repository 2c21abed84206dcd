use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Basic status object: version, uptime, and whether an AI credential is set.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "uptime": state.started_at.elapsed().as_secs_f64(),
        "version": env!("CARGO_PKG_VERSION"),
        "aiConfigured": state.config.ai.api_key.is_some(),
    }))
}

/// GET /ready
pub async fn ready_handler() -> Json<Value> {
    Json(json!({
        "status": "ready",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// GET /live
pub async fn live_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "alive",
        "timestamp": Utc::now().to_rfc3339(),
        "uptime": state.started_at.elapsed().as_secs_f64(),
    }))
}
