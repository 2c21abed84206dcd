mod assistant;
mod clock;
mod config;
mod drafts;
mod errors;
mod llm_client;
mod response;
mod routes;
mod runs;
mod state;
mod telemetry;
mod text;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::assistant::Assistant;
use crate::config::Config;
use crate::drafts::store::DraftStore;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::runs::store::RunStore;
use crate::state::AppState;
use crate::telemetry::Telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Proposal API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client; without a credential the assistant serves its
    // deterministic local fallbacks and no endpoint degrades.
    let llm = LlmClient::new(&config.ai);
    if llm.is_configured() {
        info!("LLM client initialized (model: {})", config.ai.model);
    } else {
        info!("No AI credential configured; assistant will use local fallbacks");
    }

    // Build the in-memory stores and app state
    let runs = Arc::new(RunStore::new());
    let drafts = Arc::new(DraftStore::new(config.enforce_unique_draft_names));
    let telemetry = Arc::new(Telemetry::new());
    let state = AppState {
        runs: Arc::clone(&runs),
        drafts: Arc::clone(&drafts),
        assistant: Arc::new(Assistant::new(Arc::new(llm))),
        telemetry: Arc::clone(&telemetry),
        config: config.clone(),
        started_at: Instant::now(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Teardown clears every run, draft, index, archive, and counter at once.
    runs.clear();
    drafts.clear();
    telemetry.reset();
    info!("Stores cleared, shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
}
