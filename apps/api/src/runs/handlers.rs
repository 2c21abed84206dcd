//! Axum route handlers for the runs API.
//!
//! Handlers validate at the boundary and translate between the wire envelope
//! and store operations; the store never sees unvalidated shapes. The plan
//! and suggest handlers await the assistant outside the store lock, so the
//! final chat append lands in completion order.

use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::assistant::PlanUpload;
use crate::errors::ApiError;
use crate::response::Envelope;
use crate::runs::models::{
    ArchiveSummary, ChatEntry, CommitChange, CreateRun, Deliverable, DeliverablePatch,
    DeliverableSeed, ExportRecord, LlmChange, PdfMeta, RunView, SuggestionStatus, UpdateRun,
};
use crate::state::AppState;

const MAX_RUN_NAME_CHARS: usize = 160;
const MAX_FILE_NAME_CHARS: usize = 200;
const MAX_PROMPT_CHARS: usize = 4000;
const JSON_BODY_LIMIT: usize = 1024 * 1024;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRunRequest {
    pub run_name: String,
    pub file_name: String,
    #[serde(default)]
    pub project_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceDeliverablesRequest {
    pub deliverables: Vec<DeliverableSeed>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestRequest {
    pub prompt: String,
    // Accepted for client compatibility; targeting data is not used yet.
    #[serde(default)]
    #[allow(dead_code)]
    pub section_id: Option<Uuid>,
    #[serde(default)]
    #[allow(dead_code)]
    pub cursor: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionStatusRequest {
    pub suggestion_id: Uuid,
    pub status: SuggestionStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanJsonBody {
    #[serde(default)]
    company_prompt: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    pub run: RunView,
    pub initial_change: LlmChange,
}

fn require_length(field: &str, value: &str, max: usize) -> Result<(), ApiError> {
    if value.is_empty() {
        return Err(ApiError::Validation(format!("{field} cannot be empty")));
    }
    if value.chars().count() > max {
        return Err(ApiError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /runs
pub async fn handle_create_run(
    State(state): State<AppState>,
    Json(request): Json<CreateRunRequest>,
) -> Result<(StatusCode, Json<Envelope<RunView>>), ApiError> {
    require_length("runName", &request.run_name, MAX_RUN_NAME_CHARS)?;
    require_length("fileName", &request.file_name, MAX_FILE_NAME_CHARS)?;
    let run = state.runs.create_run(CreateRun {
        run_name: request.run_name,
        file_name: request.file_name,
        project_id: request.project_id,
    })?;
    state.telemetry.increment("run_created");
    Ok((StatusCode::CREATED, Json(Envelope::ok(run.into()))))
}

/// GET /runs
pub async fn handle_list_runs(State(state): State<AppState>) -> Json<Envelope<Vec<RunView>>> {
    let list = state
        .runs
        .list_runs()
        .into_iter()
        .map(RunView::from)
        .collect();
    Json(Envelope::ok(list))
}

/// GET /runs/:id
pub async fn handle_get_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<RunView>>, ApiError> {
    let run = state.runs.get_run(id)?;
    Ok(Json(Envelope::ok(run.into())))
}

/// PATCH /runs/:id
pub async fn handle_update_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<UpdateRun>,
) -> Result<Json<Envelope<RunView>>, ApiError> {
    if let Some(name) = update.run_name.as_deref() {
        require_length("runName", name, MAX_RUN_NAME_CHARS)?;
    }
    let run = state.runs.update_run(id, update)?;
    Ok(Json(Envelope::ok(run.into())))
}

/// POST /runs/:id/deliverables
pub async fn handle_replace_deliverables(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReplaceDeliverablesRequest>,
) -> Result<Json<Envelope<Vec<Deliverable>>>, ApiError> {
    if request
        .deliverables
        .iter()
        .any(|seed| seed.title.trim().is_empty())
    {
        return Err(ApiError::Validation(
            "deliverable title cannot be empty".to_string(),
        ));
    }
    let deliverables = state.runs.replace_deliverables(id, request.deliverables)?;
    Ok(Json(Envelope::ok(deliverables)))
}

/// PATCH /deliverables/:id
pub async fn handle_update_deliverable(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<DeliverablePatch>,
) -> Result<Json<Envelope<()>>, ApiError> {
    state.runs.update_deliverable(id, patch)?;
    Ok(Json(Envelope::ok_empty()))
}

/// POST /runs/:id/llm/plan
///
/// Multipart upload (file part + optional companyPrompt field), with a plain
/// JSON `{companyPrompt}` body accepted as a fallback. The assistant call is
/// infallible: an unreachable model degrades to the deterministic local plan.
pub async fn handle_generate_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    req: Request,
) -> Result<Json<Envelope<PlanResponse>>, ApiError> {
    let (run_name, file_name) = state.runs.plan_context(id)?;

    let mut upload: Option<PlanUpload> = None;
    let mut pdf_meta: Option<PdfMeta> = None;
    let mut company_prompt: Option<String> = None;

    let is_multipart = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("multipart/form-data"))
        .unwrap_or(false);

    if is_multipart {
        let bad_body = |e: axum::extract::multipart::MultipartError| {
            ApiError::Validation(format!("Invalid multipart body: {e}"))
        };
        let mut multipart = Multipart::from_request(req, &())
            .await
            .map_err(|e| ApiError::Validation(format!("Invalid multipart body: {e}")))?;
        while let Some(field) = multipart.next_field().await.map_err(bad_body)? {
            let attached_name = field.file_name().map(|name| name.to_string());
            let field_name = field.name().map(|name| name.to_string());
            if let Some(filename) = attached_name {
                let data = field.bytes().await.map_err(bad_body)?;
                pdf_meta = Some(PdfMeta {
                    filename: if filename.is_empty() {
                        file_name.clone()
                    } else {
                        filename
                    },
                    pages: 1,
                });
                upload = Some(read_upload(&data));
            } else if field_name.as_deref() == Some("companyPrompt") {
                company_prompt = Some(field.text().await.map_err(bad_body)?);
            }
        }
    } else {
        let bytes = axum::body::to_bytes(req.into_body(), JSON_BODY_LIMIT)
            .await
            .map_err(|e| ApiError::Validation(format!("Unreadable request body: {e}")))?;
        if !bytes.is_empty() {
            if let Ok(body) = serde_json::from_slice::<PlanJsonBody>(&bytes) {
                company_prompt = body.company_prompt;
            }
        }
    }

    let plan = state
        .assistant
        .plan(
            &run_name,
            &file_name,
            upload.as_ref(),
            company_prompt.as_deref(),
        )
        .await;
    let (run, change) = state.runs.apply_plan(id, plan, pdf_meta)?;
    state.telemetry.increment("plan_generated");
    Ok(Json(Envelope::ok(PlanResponse {
        run: run.into(),
        initial_change: change,
    })))
}

/// Best-effort text recovery from the uploaded document. PDF extraction
/// first, lossy UTF-8 when the bytes are not a readable PDF.
fn read_upload(data: &[u8]) -> PlanUpload {
    let text = match pdf_extract::extract_text_from_mem(data) {
        Ok(text) if !text.trim().is_empty() => Some(text),
        Ok(_) => None,
        Err(e) => {
            warn!("PDF text extraction failed ({e}), falling back to raw bytes");
            Some(String::from_utf8_lossy(data).into_owned())
        }
    };
    PlanUpload {
        byte_len: data.len(),
        text,
    }
}

/// POST /runs/:id/llm/suggest
pub async fn handle_suggest(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SuggestRequest>,
) -> Result<Json<Envelope<ChatEntry>>, ApiError> {
    require_length("prompt", &request.prompt, MAX_PROMPT_CHARS)?;
    let context = state.runs.append_user_message(id, &request.prompt)?;
    let batch = state.assistant.suggest(&context, &request.prompt).await;
    let entry = state
        .runs
        .append_assistant_message(id, batch.summary, batch.suggestions)?;
    state.telemetry.increment("suggestions_generated");
    Ok(Json(Envelope::ok(entry)))
}

/// POST /runs/:id/llm/commit-change
pub async fn handle_commit_change(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CommitChange>,
) -> Result<Json<Envelope<LlmChange>>, ApiError> {
    if request.inserted_text.is_empty() {
        return Err(ApiError::Validation(
            "insertedText cannot be empty".to_string(),
        ));
    }
    if request.summary.trim().is_empty() {
        return Err(ApiError::Validation("summary cannot be empty".to_string()));
    }
    let change = state.runs.commit_change(id, request)?;
    state.telemetry.increment("change_committed");
    Ok(Json(Envelope::ok(change)))
}

/// PATCH /runs/:id/llm/suggestions/:messageId
pub async fn handle_suggestion_status(
    State(state): State<AppState>,
    Path((id, message_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<SuggestionStatusRequest>,
) -> Result<Json<Envelope<ChatEntry>>, ApiError> {
    let entry =
        state
            .runs
            .set_suggestion_status(id, message_id, request.suggestion_id, request.status)?;
    Ok(Json(Envelope::ok(entry)))
}

/// POST /runs/:id/export
pub async fn handle_export_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<ExportRecord>>, ApiError> {
    let record = state.runs.export_run(id)?;
    state.telemetry.increment("run_exported");
    Ok(Json(Envelope::ok(record)))
}

/// GET /archives
pub async fn handle_list_archives(
    State(state): State<AppState>,
) -> Json<Envelope<Vec<ArchiveSummary>>> {
    Json(Envelope::ok(state.runs.list_archives()))
}

/// GET /archives/:id
pub async fn handle_get_archive(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<RunView>>, ApiError> {
    let snapshot = state.runs.get_archive(id)?;
    Ok(Json(Envelope::ok(snapshot.into())))
}
