pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::drafts::handlers as drafts;
use crate::runs::handlers as runs;
use crate::state::AppState;
use crate::telemetry;

/// Uploaded plan documents are capped at 50 MB.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/ready", get(health::ready_handler))
        .route("/live", get(health::live_handler))
        .route(
            "/telemetry/counter",
            post(telemetry::handle_increment).get(telemetry::handle_counters),
        )
        // Runs
        .route(
            "/runs",
            post(runs::handle_create_run).get(runs::handle_list_runs),
        )
        .route(
            "/runs/:id",
            get(runs::handle_get_run).patch(runs::handle_update_run),
        )
        .route(
            "/runs/:id/deliverables",
            post(runs::handle_replace_deliverables),
        )
        .route("/deliverables/:id", patch(runs::handle_update_deliverable))
        .route("/runs/:id/llm/plan", post(runs::handle_generate_plan))
        .route("/runs/:id/llm/suggest", post(runs::handle_suggest))
        .route(
            "/runs/:id/llm/commit-change",
            post(runs::handle_commit_change),
        )
        .route(
            "/runs/:id/llm/suggestions/:message_id",
            patch(runs::handle_suggestion_status),
        )
        .route("/runs/:id/export", post(runs::handle_export_run))
        .route("/archives", get(runs::handle_list_archives))
        .route("/archives/:id", get(runs::handle_get_archive))
        // Drafts and the draft archive
        .route("/drafts", post(drafts::handle_create_draft))
        .route(
            "/drafts/:id",
            get(drafts::handle_get_draft).patch(drafts::handle_update_draft),
        )
        .route(
            "/projects/:project_id/drafts",
            get(drafts::handle_list_project_drafts),
        )
        .route("/archive", post(drafts::handle_archive_draft))
        .route("/archive/:id", get(drafts::handle_get_archived_draft))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::assistant::Assistant;
    use crate::config::{AiConfig, Config};
    use crate::drafts::store::DraftStore;
    use crate::llm_client::LlmClient;
    use crate::runs::store::RunStore;
    use crate::telemetry::Telemetry;

    /// State with no AI credential: the assistant serves local fallbacks.
    fn test_state() -> AppState {
        let config = Config {
            port: 0,
            rust_log: "info".to_string(),
            ai: AiConfig {
                api_key: None,
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4".to_string(),
                temperature: 0.3,
                max_tokens: 1200,
            },
            enforce_unique_draft_names: true,
        };
        AppState {
            runs: Arc::new(RunStore::new()),
            drafts: Arc::new(DraftStore::new(config.enforce_unique_draft_names)),
            assistant: Arc::new(Assistant::new(Arc::new(LlmClient::new(&config.ai)))),
            telemetry: Arc::new(Telemetry::new()),
            config,
            started_at: Instant::now(),
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint_reports_ok() {
        let app = build_router(test_state());
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["aiConfigured"], false);
    }

    #[tokio::test]
    async fn test_run_create_conflict_and_export_gate() {
        let app = build_router(test_state());

        let response = app
            .clone()
            .oneshot(post_json(
                "/runs",
                r#"{"runName": "Alpha", "fileName": "a.pdf"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["status"], "draft");
        assert_eq!(json["data"]["exportReady"], false);
        let run_id = json["data"]["id"].as_str().unwrap().to_string();

        // Same name in a different case collides; the suggested alternative
        // comes from the submitted file name.
        let response = app
            .clone()
            .oneshot(post_json(
                "/runs",
                r#"{"runName": "alpha", "fileName": "a.pdf"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["suggestedName"], "a_2.pdf");

        // Export is blocked while nothing is done.
        let response = app
            .clone()
            .oneshot(
                Request::post(format!("/runs/{run_id}/export"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_suggest_without_credential_uses_fallback() {
        let app = build_router(test_state());
        let response = app
            .clone()
            .oneshot(post_json(
                "/runs",
                r#"{"runName": "Beta", "fileName": "b.pdf"}"#,
            ))
            .await
            .unwrap();
        let run_id = body_json(response).await["data"]["id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/runs/{run_id}/llm/suggest"),
                r#"{"prompt": "cover encryption at rest"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let suggestions = json["data"]["suggestions"].as_array().unwrap();
        assert_eq!(suggestions.len(), 2);
        for suggestion in suggestions {
            assert_eq!(suggestion["status"], "pending");
            assert!(suggestion["content"]
                .as_str()
                .unwrap()
                .contains("cover encryption at rest"));
        }
    }

    #[tokio::test]
    async fn test_unknown_run_returns_404_envelope() {
        let app = build_router(test_state());
        let response = app
            .oneshot(
                Request::get(format!("/runs/{}", uuid::Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Run not found.");
    }
}
