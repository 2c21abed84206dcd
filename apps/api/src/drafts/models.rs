//! Data model for per-project drafts and their archive copies.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    Draft,
    Final,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSection {
    pub id: Uuid,
    pub heading: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftDeliverable {
    pub id: Uuid,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftChange {
    pub id: Uuid,
    pub summary: String,
    pub content: String,
    pub created_at: String,
    pub highlight: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_message_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSource {
    pub id: Uuid,
    pub title: String,
    pub page: Option<u32>,
    pub snippet: Option<String>,
}

/// A saved draft. Independent of runs; archives of drafts are separate
/// records with their own identity, not snapshots.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub id: Uuid,
    pub project_id: Uuid,
    pub file_name: String,
    /// Content-addressed handle derived from the file name; regenerated
    /// whenever the file name changes.
    pub slug: String,
    pub pdf_id: Option<Uuid>,
    pub title: String,
    pub status: DraftStatus,
    pub sections: Vec<DraftSection>,
    pub deliverables: Vec<DraftDeliverable>,
    pub llm_changes: Vec<DraftChange>,
    pub sources: Vec<DraftSource>,
    pub version: u32,
    pub created_at: String,
    pub updated_at: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Operation inputs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSectionInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub heading: String,
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftDeliverableInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftChangeInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub summary: String,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub highlight: bool,
    #[serde(default)]
    pub source_message_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSourceInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDraft {
    pub project_id: Uuid,
    pub file_name: String,
    pub title: String,
    #[serde(default)]
    pub status: Option<DraftStatus>,
    #[serde(default)]
    pub pdf_id: Option<Uuid>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub sections: Vec<DraftSectionInput>,
    #[serde(default)]
    pub deliverables: Vec<DraftDeliverableInput>,
    #[serde(default)]
    pub llm_changes: Vec<DraftChangeInput>,
    #[serde(default)]
    pub sources: Vec<DraftSourceInput>,
}

/// Field-by-field partial merge; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDraft {
    pub file_name: Option<String>,
    pub title: Option<String>,
    pub status: Option<DraftStatus>,
    pub pdf_id: Option<Uuid>,
    pub sections: Option<Vec<DraftSectionInput>>,
    pub deliverables: Option<Vec<DraftDeliverableInput>>,
    pub llm_changes: Option<Vec<DraftChangeInput>>,
    pub sources: Option<Vec<DraftSourceInput>>,
}
