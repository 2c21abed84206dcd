//! Axum route handlers for the drafts API and the draft archive.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::drafts::models::{CreateDraft, Draft, DraftStatus, UpdateDraft};
use crate::errors::ApiError;
use crate::response::{Envelope, Pagination};
use crate::state::AppState;

const MAX_TITLE_CHARS: usize = 200;
const MAX_FILE_NAME_CHARS: usize = 200;
const DEFAULT_PAGE_LIMIT: usize = 20;
const MAX_PAGE_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct DraftListQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<DraftStatus>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

fn validate_create(input: &CreateDraft) -> Result<(), ApiError> {
    validate_name("fileName", &input.file_name)?;
    if input.title.is_empty() || input.title.chars().count() > MAX_TITLE_CHARS {
        return Err(ApiError::Validation(format!(
            "title must be 1-{MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(())
}

fn validate_name(field: &str, value: &str) -> Result<(), ApiError> {
    if value.is_empty() || value.chars().count() > MAX_FILE_NAME_CHARS {
        return Err(ApiError::Validation(format!(
            "{field} must be 1-{MAX_FILE_NAME_CHARS} characters"
        )));
    }
    Ok(())
}

/// POST /drafts
pub async fn handle_create_draft(
    State(state): State<AppState>,
    Json(input): Json<CreateDraft>,
) -> Result<(StatusCode, Json<Envelope<Draft>>), ApiError> {
    validate_create(&input)?;
    let draft = state.drafts.create_draft(input)?;
    state.telemetry.increment("draft_created");
    Ok((StatusCode::CREATED, Json(Envelope::ok(draft))))
}

/// GET /drafts/:id
pub async fn handle_get_draft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<Draft>>, ApiError> {
    Ok(Json(Envelope::ok(state.drafts.get_draft(id)?)))
}

/// PATCH /drafts/:id
pub async fn handle_update_draft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<UpdateDraft>,
) -> Result<Json<Envelope<Draft>>, ApiError> {
    if let Some(file_name) = update.file_name.as_deref() {
        validate_name("fileName", file_name)?;
    }
    if let Some(title) = update.title.as_deref() {
        if title.is_empty() || title.chars().count() > MAX_TITLE_CHARS {
            return Err(ApiError::Validation(format!(
                "title must be 1-{MAX_TITLE_CHARS} characters"
            )));
        }
    }
    Ok(Json(Envelope::ok(state.drafts.update_draft(id, update)?)))
}

/// GET /projects/:projectId/drafts
pub async fn handle_list_project_drafts(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<DraftListQuery>,
) -> Result<Json<Envelope<Vec<Draft>>>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .clamp(1, MAX_PAGE_LIMIT);
    let (drafts, total) =
        state
            .drafts
            .list_drafts(project_id, query.search.as_deref(), query.status, page, limit);
    Ok(Json(Envelope::paginated(
        drafts,
        Pagination { total, page, limit },
    )))
}

/// POST /archive
pub async fn handle_archive_draft(
    State(state): State<AppState>,
    Json(input): Json<CreateDraft>,
) -> Result<(StatusCode, Json<Envelope<Draft>>), ApiError> {
    validate_create(&input)?;
    let draft = state.drafts.archive_draft(input)?;
    state.telemetry.increment("draft_archived");
    Ok((StatusCode::CREATED, Json(Envelope::ok(draft))))
}

/// GET /archive/:id
pub async fn handle_get_archived_draft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<Draft>>, ApiError> {
    Ok(Json(Envelope::ok(state.drafts.get_archived(id)?)))
}
