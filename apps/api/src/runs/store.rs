//! Run store: the in-memory registry of proposal runs.
//!
//! Owns the primary run map plus two secondary indexes (case-insensitive run
//! name, deliverable id -> run id) and the archive map. All of it sits behind
//! one mutex so a mutation is never observed half-applied; LLM calls are
//! awaited by the handlers outside the lock, and only the final append step
//! re-enters it. Runs are never deleted in-session; `clear` is the only
//! teardown, fired on shutdown and between tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::info;
use uuid::Uuid;

use crate::assistant::Plan;
use crate::clock::Stamper;
use crate::errors::ApiError;
use crate::runs::compose::{compose, export_ready};
use crate::runs::models::{
    ArchiveEntry, ArchiveSummary, ChatEntry, ChatRole, ChatSuggestion, ChecklistItem,
    ChecklistToggle, CommitChange, CreateRun, Deliverable, DeliverablePatch, DeliverableSeed,
    DeliverableStatus, ExportRecord, HighlightAnchor, LlmChange, PdfMeta, Run, RunStatus, Section,
    SuggestionStatus, UpdateRun,
};
use crate::text::{build_suggested_name, sanitize_text};

#[derive(Default)]
pub struct RunStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    runs: HashMap<Uuid, Run>,
    /// Lowercased run name -> run id. One entry per live run.
    name_index: HashMap<String, Uuid>,
    /// Deliverable id -> run id, for direct deliverable-scoped PATCHes.
    /// Entries for replaced deliverables go stale; the per-run lookup in
    /// `update_deliverable` is what reports those as missing.
    deliverable_index: HashMap<Uuid, Uuid>,
    /// One entry per run, overwritten on every mutation: the latest full
    /// state, not a version log.
    archives: HashMap<Uuid, ArchiveEntry>,
    stamper: Stamper,
}

fn run_not_found() -> ApiError {
    ApiError::NotFound("Run not found.".to_string())
}

/// The suggested alternative is derived from the file name, so the client
/// can resubmit with e.g. `a_2.pdf`.
fn name_conflict(file_name: &str) -> ApiError {
    ApiError::Conflict {
        message: "A run with that name already exists.".to_string(),
        suggested_name: build_suggested_name(file_name),
    }
}

/// Deep-clones the run and upserts its archive entry, carrying forward the
/// original `createdAt` when one already exists.
fn snapshot(inner: &mut Inner, run_id: Uuid) {
    let Some(copy) = inner.runs.get(&run_id).cloned() else {
        return;
    };
    let entry = inner
        .archives
        .entry(run_id)
        .or_insert_with(|| ArchiveEntry {
            id: run_id,
            run_id,
            run_name: copy.run_name.clone(),
            file_name: copy.file_name.clone(),
            created_at: copy.created_at.clone(),
            updated_at: copy.updated_at.clone(),
            snapshot: copy.clone(),
        });
    entry.run_name = copy.run_name.clone();
    entry.file_name = copy.file_name.clone();
    entry.updated_at = copy.updated_at.clone();
    entry.snapshot = copy;
}

impl RunStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create_run(&self, input: CreateRun) -> Result<Run, ApiError> {
        let mut inner = self.lock();
        let key = input.run_name.to_lowercase();
        if inner.name_index.contains_key(&key) {
            return Err(name_conflict(&input.file_name));
        }
        let now = inner.stamper.next();
        let run = Run {
            id: Uuid::new_v4(),
            project_id: input.project_id,
            run_name: input.run_name,
            file_name: input.file_name,
            status: RunStatus::Draft,
            created_at: now.clone(),
            updated_at: now,
            deliverables: Vec::new(),
            sections: Vec::new(),
            llm_changes: Vec::new(),
            chat: Vec::new(),
            pdf_meta: None,
            exports: Vec::new(),
        };
        let id = run.id;
        inner.name_index.insert(key, id);
        inner.runs.insert(id, run.clone());
        snapshot(&mut inner, id);
        info!(run_id = %id, "Run created");
        Ok(run)
    }

    pub fn get_run(&self, id: Uuid) -> Result<Run, ApiError> {
        self.lock().runs.get(&id).cloned().ok_or_else(run_not_found)
    }

    /// All runs, most recently updated first.
    pub fn list_runs(&self) -> Vec<Run> {
        let inner = self.lock();
        let mut list: Vec<Run> = inner.runs.values().cloned().collect();
        list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        list
    }

    /// Applies only the provided fields. A rename re-validates uniqueness
    /// against the index (the run's own entry excluded) and moves the index
    /// entry atomically with the name change.
    pub fn update_run(&self, id: Uuid, update: UpdateRun) -> Result<Run, ApiError> {
        let mut inner = self.lock();
        let (current_key, file_name) = match inner.runs.get(&id) {
            Some(run) => (run.run_name.to_lowercase(), run.file_name.clone()),
            None => return Err(run_not_found()),
        };

        if let Some(new_name) = update.run_name.as_ref() {
            let new_key = new_name.to_lowercase();
            if new_key != current_key {
                if inner.name_index.contains_key(&new_key) {
                    return Err(name_conflict(&file_name));
                }
                inner.name_index.remove(&current_key);
                inner.name_index.insert(new_key, id);
                if let Some(run) = inner.runs.get_mut(&id) {
                    run.run_name = new_name.clone();
                }
            }
        }

        let stamp = inner.stamper.next();
        let mut index_pairs: Vec<(Uuid, Uuid)> = Vec::new();
        let run = inner.runs.get_mut(&id).ok_or_else(run_not_found)?;

        if let Some(status) = update.status {
            run.status = status;
        }
        if let Some(sections) = update.sections {
            run.sections = sections;
        }
        if let Some(deliverables) = update.deliverables {
            run.deliverables = deliverables
                .into_iter()
                .map(|input| Deliverable {
                    id: input.id,
                    run_id: id,
                    title: input.title,
                    description: input.description,
                    status: input.status,
                    checklist_items: input.checklist_items,
                })
                .collect();
            index_pairs = run
                .deliverables
                .iter()
                .map(|deliverable| (deliverable.id, id))
                .collect();
        }
        if let Some(changes) = update.llm_changes {
            run.llm_changes = changes
                .into_iter()
                .map(|input| LlmChange {
                    id: input.id,
                    run_id: id,
                    section_id: input.section_id,
                    summary: input.summary,
                    inserted_text: input.inserted_text,
                    created_at: input.created_at,
                    approved_by_user: input.approved_by_user,
                    highlight_anchor: input.highlight_anchor,
                    source_message_id: input.source_message_id,
                })
                .collect();
        }

        run.updated_at = stamp;
        let result = run.clone();
        for (deliverable_id, run_id) in index_pairs {
            inner.deliverable_index.insert(deliverable_id, run_id);
        }
        snapshot(&mut inner, id);
        Ok(result)
    }

    /// Wholesale replacement from the simplified input shape. Every
    /// deliverable and checklist item gets a fresh id; nothing is merged
    /// with prior state.
    pub fn replace_deliverables(
        &self,
        run_id: Uuid,
        seeds: Vec<DeliverableSeed>,
    ) -> Result<Vec<Deliverable>, ApiError> {
        let mut inner = self.lock();
        if !inner.runs.contains_key(&run_id) {
            return Err(run_not_found());
        }
        let stamp = inner.stamper.next();
        let run = inner.runs.get_mut(&run_id).ok_or_else(run_not_found)?;
        run.deliverables = seeds
            .into_iter()
            .map(|seed| Deliverable {
                id: Uuid::new_v4(),
                run_id,
                title: sanitize_text(&seed.title),
                description: sanitize_text(&seed.description),
                status: DeliverableStatus::Todo,
                checklist_items: seed
                    .checklist
                    .iter()
                    .enumerate()
                    .map(|(idx, text)| ChecklistItem {
                        id: Uuid::new_v4(),
                        text: sanitize_text(text),
                        done: false,
                        order: idx as u32,
                    })
                    .collect(),
            })
            .collect();
        run.updated_at = stamp;
        let result = run.deliverables.clone();
        for deliverable in &result {
            inner.deliverable_index.insert(deliverable.id, run_id);
        }
        snapshot(&mut inner, run_id);
        Ok(result)
    }

    /// Resolves the run through the deliverable index, then mutates the
    /// deliverable's status and/or flips one checklist item.
    pub fn update_deliverable(
        &self,
        deliverable_id: Uuid,
        patch: DeliverablePatch,
    ) -> Result<(), ApiError> {
        let mut inner = self.lock();
        let run_id = *inner
            .deliverable_index
            .get(&deliverable_id)
            .ok_or_else(|| ApiError::NotFound("Deliverable not found.".to_string()))?;
        if !inner.runs.contains_key(&run_id) {
            return Err(ApiError::NotFound(
                "Run not found for deliverable.".to_string(),
            ));
        }
        let stamp = inner.stamper.next();
        let run = inner.runs.get_mut(&run_id).ok_or_else(run_not_found)?;
        let deliverable = run
            .deliverables
            .iter_mut()
            .find(|deliverable| deliverable.id == deliverable_id)
            .ok_or_else(|| ApiError::NotFound("Deliverable not found.".to_string()))?;
        if let Some(status) = patch.status {
            deliverable.status = status;
        }
        if let Some(toggle) = patch.checklist_item {
            for item in deliverable.checklist_items.iter_mut() {
                if item.id == toggle.id {
                    item.done = toggle.done;
                }
            }
        }
        run.updated_at = stamp;
        snapshot(&mut inner, run_id);
        Ok(())
    }

    /// Read-only lookup of the names the plan prompt needs.
    pub fn plan_context(&self, run_id: Uuid) -> Result<(String, String), ApiError> {
        let inner = self.lock();
        let run = inner.runs.get(&run_id).ok_or_else(run_not_found)?;
        Ok((run.run_name.clone(), run.file_name.clone()))
    }

    /// Installs a generated plan: one synthesized section, deliverables from
    /// the plan list, and one appended approved change spanning the whole
    /// inserted draft.
    pub fn apply_plan(
        &self,
        run_id: Uuid,
        plan: Plan,
        pdf_meta: Option<PdfMeta>,
    ) -> Result<(Run, LlmChange), ApiError> {
        let mut inner = self.lock();
        if !inner.runs.contains_key(&run_id) {
            return Err(run_not_found());
        }
        let stamp = inner.stamper.next();
        let run = inner.runs.get_mut(&run_id).ok_or_else(run_not_found)?;

        let section_id = Uuid::new_v4();
        run.sections = vec![Section {
            id: section_id,
            heading: "Executive Summary".to_string(),
            content: plan.draft.clone(),
            order: 0,
        }];
        run.deliverables = plan
            .deliverables
            .iter()
            .map(|item| Deliverable {
                id: Uuid::new_v4(),
                run_id,
                title: sanitize_text(&item.title),
                description: sanitize_text(&item.description),
                status: DeliverableStatus::Todo,
                checklist_items: item
                    .checklist
                    .iter()
                    .enumerate()
                    .map(|(idx, text)| ChecklistItem {
                        id: Uuid::new_v4(),
                        text: sanitize_text(text),
                        done: false,
                        order: idx as u32,
                    })
                    .collect(),
            })
            .collect();

        let summary = {
            let cleaned = sanitize_text(&plan.summary);
            if cleaned.is_empty() {
                "Initial draft generated".to_string()
            } else {
                cleaned
            }
        };
        let change = LlmChange {
            id: Uuid::new_v4(),
            run_id,
            section_id: Some(section_id),
            summary,
            inserted_text: plan.draft.clone(),
            created_at: stamp.clone(),
            approved_by_user: true,
            highlight_anchor: Some(HighlightAnchor {
                start_offset: 0,
                end_offset: plan.draft.chars().count() as u32,
            }),
            source_message_id: None,
        };
        run.llm_changes.push(change.clone());
        if pdf_meta.is_some() {
            run.pdf_meta = pdf_meta;
        }
        run.updated_at = stamp;

        let result = run.clone();
        let pairs: Vec<Uuid> = result
            .deliverables
            .iter()
            .map(|deliverable| deliverable.id)
            .collect();
        for deliverable_id in pairs {
            inner.deliverable_index.insert(deliverable_id, run_id);
        }
        snapshot(&mut inner, run_id);
        Ok((result, change))
    }

    /// Records the user's prompt in the chat and returns the composed section
    /// context for the suggestion call. The assistant call happens outside
    /// the lock; the assistant turn lands via `append_assistant_message`, so
    /// two concurrent requests interleave in completion order.
    pub fn append_user_message(&self, run_id: Uuid, prompt: &str) -> Result<String, ApiError> {
        let mut inner = self.lock();
        if !inner.runs.contains_key(&run_id) {
            return Err(run_not_found());
        }
        let stamp = inner.stamper.next();
        let run = inner.runs.get_mut(&run_id).ok_or_else(run_not_found)?;
        run.chat.push(ChatEntry {
            id: Uuid::new_v4(),
            role: ChatRole::User,
            content: prompt.to_string(),
            created_at: stamp.clone(),
            suggestions: None,
        });
        run.updated_at = stamp;
        let context = compose(&run.sections);
        snapshot(&mut inner, run_id);
        Ok(context)
    }

    pub fn append_assistant_message(
        &self,
        run_id: Uuid,
        summary: String,
        suggestions: Vec<ChatSuggestion>,
    ) -> Result<ChatEntry, ApiError> {
        let mut inner = self.lock();
        if !inner.runs.contains_key(&run_id) {
            return Err(run_not_found());
        }
        let stamp = inner.stamper.next();
        let run = inner.runs.get_mut(&run_id).ok_or_else(run_not_found)?;
        let entry = ChatEntry {
            id: Uuid::new_v4(),
            role: ChatRole::Assistant,
            content: summary,
            created_at: stamp.clone(),
            suggestions: Some(suggestions),
        };
        run.chat.push(entry.clone());
        run.updated_at = stamp;
        snapshot(&mut inner, run_id);
        Ok(entry)
    }

    /// Appends an approved change; when both source message and suggestion id
    /// are given, flips that suggestion to `inserted` (best effort, silent on
    /// a missing target, matching the client contract).
    pub fn commit_change(&self, run_id: Uuid, input: CommitChange) -> Result<LlmChange, ApiError> {
        let mut inner = self.lock();
        if !inner.runs.contains_key(&run_id) {
            return Err(run_not_found());
        }
        let stamp = inner.stamper.next();
        let run = inner.runs.get_mut(&run_id).ok_or_else(run_not_found)?;
        let change = LlmChange {
            id: Uuid::new_v4(),
            run_id,
            section_id: input.section_id,
            summary: sanitize_text(&input.summary),
            inserted_text: input.inserted_text,
            created_at: stamp.clone(),
            approved_by_user: true,
            highlight_anchor: input.anchor,
            source_message_id: input.source_message_id,
        };
        run.llm_changes.push(change.clone());
        if let (Some(message_id), Some(suggestion_id)) =
            (input.source_message_id, input.suggestion_id)
        {
            if let Some(entry) = run.chat.iter_mut().find(|entry| entry.id == message_id) {
                if let Some(suggestions) = entry.suggestions.as_mut() {
                    for suggestion in suggestions.iter_mut() {
                        if suggestion.id == suggestion_id {
                            suggestion.status = SuggestionStatus::Inserted;
                        }
                    }
                }
            }
        }
        run.updated_at = stamp;
        snapshot(&mut inner, run_id);
        Ok(change)
    }

    /// Updates exactly one suggestion's status within one chat entry.
    pub fn set_suggestion_status(
        &self,
        run_id: Uuid,
        message_id: Uuid,
        suggestion_id: Uuid,
        status: SuggestionStatus,
    ) -> Result<ChatEntry, ApiError> {
        let mut inner = self.lock();
        if !inner.runs.contains_key(&run_id) {
            return Err(run_not_found());
        }
        let stamp = inner.stamper.next();
        let run = inner.runs.get_mut(&run_id).ok_or_else(run_not_found)?;
        let missing = || ApiError::NotFound("Suggestion not found for message.".to_string());
        let entry = run
            .chat
            .iter_mut()
            .find(|entry| entry.id == message_id)
            .ok_or_else(missing)?;
        let suggestions = entry.suggestions.as_mut().ok_or_else(missing)?;
        let target = suggestions
            .iter_mut()
            .find(|suggestion| suggestion.id == suggestion_id)
            .ok_or_else(missing)?;
        target.status = status;
        let result = entry.clone();
        run.updated_at = stamp;
        snapshot(&mut inner, run_id);
        Ok(result)
    }

    /// Flips the run to `exported` and records the export, provided every
    /// deliverable and checklist item is done.
    pub fn export_run(&self, run_id: Uuid) -> Result<ExportRecord, ApiError> {
        let mut inner = self.lock();
        let ready = match inner.runs.get(&run_id) {
            Some(run) => export_ready(&run.deliverables),
            None => return Err(run_not_found()),
        };
        if !ready {
            return Err(ApiError::ExportNotReady(
                "Complete all deliverables and checklist items before exporting.".to_string(),
            ));
        }
        let stamp = inner.stamper.next();
        let run = inner.runs.get_mut(&run_id).ok_or_else(run_not_found)?;
        let record = ExportRecord {
            id: Uuid::new_v4(),
            created_at: stamp.clone(),
        };
        run.exports.push(record.clone());
        run.status = RunStatus::Exported;
        run.updated_at = stamp;
        snapshot(&mut inner, run_id);
        info!(run_id = %run_id, "Run exported");
        Ok(record)
    }

    pub fn list_archives(&self) -> Vec<ArchiveSummary> {
        let inner = self.lock();
        let mut list: Vec<ArchiveSummary> = inner
            .archives
            .values()
            .map(|entry| ArchiveSummary {
                id: entry.id,
                run_id: entry.run_id,
                title: entry.run_name.clone(),
                file_name: entry.file_name.clone(),
                updated_at: entry.updated_at.clone(),
            })
            .collect();
        list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        list
    }

    /// The archived snapshot for one run: its latest state as of the last
    /// mutation.
    pub fn get_archive(&self, id: Uuid) -> Result<Run, ApiError> {
        let inner = self.lock();
        inner
            .archives
            .get(&id)
            .map(|entry| entry.snapshot.clone())
            .ok_or_else(|| ApiError::NotFound("Archive not found.".to_string()))
    }

    /// Process-wide teardown: drops every run, index, and archive at once.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.runs.clear();
        inner.name_index.clear();
        inner.deliverable_index.clear();
        inner.archives.clear();
    }
}
