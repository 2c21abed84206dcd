//! Data model for proposal runs and their owned collections.
//!
//! Every nested collection is owned exclusively by its run; the derived
//! `Clone` impls are what the archive snapshot relies on for structurally
//! independent deep copies.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::runs::compose::export_ready;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Draft,
    Exported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliverableStatus {
    Todo,
    InProgress,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    Pending,
    Inserted,
    Dismissed,
}

/// An ordered chunk of the run's composed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: Uuid,
    pub heading: String,
    pub content: String,
    pub order: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub id: Uuid,
    pub text: String,
    pub done: bool,
    pub order: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deliverable {
    pub id: Uuid,
    pub run_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: DeliverableStatus,
    pub checklist_items: Vec<ChecklistItem>,
}

/// Anchor into the composed document, in characters, for UI highlighting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightAnchor {
    pub start_offset: u32,
    pub end_offset: u32,
}

/// One committed textual insertion. Append-only per run; never mutated after
/// creation (suggestion lifecycle lives on the chat entry instead).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmChange {
    pub id: Uuid,
    pub run_id: Uuid,
    pub section_id: Option<Uuid>,
    pub summary: String,
    pub inserted_text: String,
    pub created_at: String,
    pub approved_by_user: bool,
    pub highlight_anchor: Option<HighlightAnchor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_message_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSuggestion {
    pub id: Uuid,
    pub summary: String,
    pub content: String,
    pub status: SuggestionStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub id: Uuid,
    pub role: ChatRole,
    pub content: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<ChatSuggestion>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfMeta {
    pub filename: String,
    /// Placeholder until real page counting exists.
    pub pages: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    pub id: Uuid,
    pub created_at: String,
}

/// The unit of work for one proposal-drafting session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub run_name: String,
    pub file_name: String,
    pub status: RunStatus,
    pub created_at: String,
    pub updated_at: String,
    pub deliverables: Vec<Deliverable>,
    pub sections: Vec<Section>,
    pub llm_changes: Vec<LlmChange>,
    pub chat: Vec<ChatEntry>,
    pub pdf_meta: Option<PdfMeta>,
    pub exports: Vec<ExportRecord>,
}

/// Wire view of a run: the run plus derived export readiness, recomputed on
/// every serialization rather than cached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunView {
    #[serde(flatten)]
    pub run: Run,
    pub export_ready: bool,
}

impl From<Run> for RunView {
    fn from(run: Run) -> Self {
        let ready = export_ready(&run.deliverables);
        Self {
            run,
            export_ready: ready,
        }
    }
}

/// Archive entry: the latest full-state snapshot of one run, keyed by run id
/// and overwritten on every mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry {
    pub id: Uuid,
    pub run_id: Uuid,
    pub run_name: String,
    pub file_name: String,
    pub created_at: String,
    pub updated_at: String,
    pub snapshot: Run,
}

/// Listing row for GET /archives.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveSummary {
    pub id: Uuid,
    pub run_id: Uuid,
    pub title: String,
    pub file_name: String,
    pub updated_at: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Operation inputs (validated at the handler boundary before entering the
// store; the store never sees raw request shapes)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CreateRun {
    pub run_name: String,
    pub file_name: String,
    pub project_id: Option<Uuid>,
}

/// Client-supplied deliverable for a wholesale PATCH replace. `runId` is
/// assigned by the store, never taken from the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverableInput {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: DeliverableStatus,
    #[serde(default)]
    pub checklist_items: Vec<ChecklistItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmChangeInput {
    pub id: Uuid,
    #[serde(default)]
    pub section_id: Option<Uuid>,
    pub summary: String,
    pub inserted_text: String,
    pub created_at: String,
    pub approved_by_user: bool,
    #[serde(default)]
    pub highlight_anchor: Option<HighlightAnchor>,
    #[serde(default)]
    pub source_message_id: Option<Uuid>,
}

/// Partial update: only provided fields are applied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRun {
    pub run_name: Option<String>,
    pub status: Option<RunStatus>,
    pub sections: Option<Vec<Section>>,
    pub deliverables: Option<Vec<DeliverableInput>>,
    pub llm_changes: Option<Vec<LlmChangeInput>>,
}

/// Simplified deliverable shape for POST /runs/:id/deliverables: checklist
/// items arrive as plain strings and get fresh ids.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverableSeed {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub checklist: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistToggle {
    pub id: Uuid,
    pub done: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverablePatch {
    pub status: Option<DeliverableStatus>,
    pub checklist_item: Option<ChecklistToggle>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitChange {
    #[serde(default)]
    pub section_id: Option<Uuid>,
    pub inserted_text: String,
    pub summary: String,
    #[serde(default)]
    pub anchor: Option<HighlightAnchor>,
    #[serde(default)]
    pub source_message_id: Option<Uuid>,
    #[serde(default)]
    pub suggestion_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deliverable_status_serde_uses_snake_case() {
        assert_eq!(
            serde_json::to_string(&DeliverableStatus::InProgress).unwrap(),
            r#""in_progress""#
        );
        let parsed: DeliverableStatus = serde_json::from_str(r#""todo""#).unwrap();
        assert_eq!(parsed, DeliverableStatus::Todo);
    }

    #[test]
    fn test_run_status_serde_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&RunStatus::Exported).unwrap(),
            r#""exported""#
        );
    }

    #[test]
    fn test_run_view_reports_export_ready() {
        let run_id = Uuid::new_v4();
        let run = Run {
            id: run_id,
            project_id: None,
            run_name: "Alpha".to_string(),
            file_name: "a.pdf".to_string(),
            status: RunStatus::Draft,
            created_at: "2024-01-01T00:00:00.000000Z".to_string(),
            updated_at: "2024-01-01T00:00:00.000000Z".to_string(),
            deliverables: vec![Deliverable {
                id: Uuid::new_v4(),
                run_id,
                title: "SSP".to_string(),
                description: String::new(),
                status: DeliverableStatus::Done,
                checklist_items: vec![],
            }],
            sections: vec![],
            llm_changes: vec![],
            chat: vec![],
            pdf_meta: None,
            exports: vec![],
        };
        let view = RunView::from(run);
        assert!(view.export_ready);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["exportReady"], true);
        assert_eq!(json["runName"], "Alpha");
    }

    #[test]
    fn test_deliverable_input_defaults_optional_fields() {
        let json = serde_json::json!({
            "id": Uuid::new_v4(),
            "title": "POA&M",
            "status": "todo"
        });
        let input: DeliverableInput = serde_json::from_value(json).unwrap();
        assert!(input.description.is_empty());
        assert!(input.checklist_items.is_empty());
    }

    #[test]
    fn test_chat_entry_omits_absent_suggestions() {
        let entry = ChatEntry {
            id: Uuid::new_v4(),
            role: ChatRole::User,
            content: "hello".to_string(),
            created_at: "2024-01-01T00:00:00.000000Z".to_string(),
            suggestions: None,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("suggestions").is_none());
        assert_eq!(json["role"], "user");
    }
}
