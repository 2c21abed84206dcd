//! Best-effort in-process counters.
//!
//! The sink is fire-and-forget: `increment` cannot fail its caller and is
//! never awaited on the critical path. Counters reset with the process.

use std::collections::HashMap;
use std::sync::Mutex;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::errors::ApiError;
use crate::response::Envelope;
use crate::state::AppState;

#[derive(Debug, Default)]
pub struct Telemetry {
    counters: Mutex<HashMap<String, u64>>,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bumps a named counter. Swallows a poisoned lock rather than panic:
    /// telemetry must never take a request down with it.
    pub fn increment(&self, name: &str) {
        if let Ok(mut counters) = self.counters.lock() {
            *counters.entry(name.to_string()).or_insert(0) += 1;
        }
    }

    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.counters
            .lock()
            .map(|counters| counters.clone())
            .unwrap_or_default()
    }

    pub fn reset(&self) {
        if let Ok(mut counters) = self.counters.lock() {
            counters.clear();
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CounterRequest {
    name: String,
}

/// POST /telemetry/counter
pub async fn handle_increment(
    State(state): State<AppState>,
    Json(request): Json<CounterRequest>,
) -> Result<Json<Envelope<()>>, ApiError> {
    if request.name.is_empty() {
        return Err(ApiError::Validation("name cannot be empty".to_string()));
    }
    state.telemetry.increment(&request.name);
    Ok(Json(Envelope::ok_empty()))
}

/// GET /telemetry/counter
pub async fn handle_counters(
    State(state): State<AppState>,
) -> Result<Json<Envelope<HashMap<String, u64>>>, ApiError> {
    Ok(Json(Envelope::ok(state.telemetry.snapshot())))
}
