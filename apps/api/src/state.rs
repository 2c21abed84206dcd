use std::sync::Arc;
use std::time::Instant;

use crate::assistant::Assistant;
use crate::config::Config;
use crate::drafts::store::DraftStore;
use crate::runs::store::RunStore;
use crate::telemetry::Telemetry;

/// Shared application state injected into all route handlers via Axum
/// extractors. Constructed once in `main` and passed by reference; the
/// stores are never reachable as module globals, so tests build their own
/// isolated instances and teardown is a method call.
#[derive(Clone)]
pub struct AppState {
    pub runs: Arc<RunStore>,
    pub drafts: Arc<DraftStore>,
    pub assistant: Arc<Assistant>,
    pub telemetry: Arc<Telemetry>,
    pub config: Config,
    pub started_at: Instant,
}
