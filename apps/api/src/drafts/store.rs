//! Draft store: per-project in-memory draft registry.
//!
//! Simpler sibling of the run store. Drafts index by project (an id set,
//! plus a name map when unique-file-name enforcement is on). Archived
//! drafts are full records in a separate map with their own identity; they
//! are not snapshots of live drafts and the two maps never share an entry.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::info;
use uuid::Uuid;

use crate::clock::Stamper;
use crate::errors::ApiError;
use crate::drafts::models::{
    CreateDraft, Draft, DraftChange, DraftChangeInput, DraftDeliverable, DraftDeliverableInput,
    DraftSection, DraftSectionInput, DraftSource, DraftSourceInput, DraftStatus, UpdateDraft,
};
use crate::text::{build_suggested_name, sanitize_text};

pub struct DraftStore {
    inner: Mutex<Inner>,
    /// FF_UNIQUE_DRAFT_NAMES: reject duplicate file names within a project.
    enforce_unique_names: bool,
}

#[derive(Default)]
struct Inner {
    drafts: HashMap<Uuid, Draft>,
    project_index: HashMap<Uuid, HashSet<Uuid>>,
    /// (project id, lowercased file name) -> draft id. Maintained only when
    /// enforcement is on.
    name_index: HashMap<(Uuid, String), Uuid>,
    archived: HashMap<Uuid, Draft>,
    archive_name_index: HashMap<(Uuid, String), Uuid>,
    stamper: Stamper,
}

fn draft_not_found() -> ApiError {
    ApiError::NotFound("Draft not found.".to_string())
}

fn file_conflict(file_name: &str) -> ApiError {
    ApiError::Conflict {
        message: "A draft with that file name already exists in this project.".to_string(),
        suggested_name: build_suggested_name(file_name),
    }
}

fn section_from(input: DraftSectionInput) -> DraftSection {
    DraftSection {
        id: input.id.unwrap_or_else(Uuid::new_v4),
        heading: sanitize_text(&input.heading),
        body: input.body.trim().to_string(),
    }
}

fn deliverable_from(input: DraftDeliverableInput) -> Option<DraftDeliverable> {
    let title = sanitize_text(&input.title);
    if title.is_empty() {
        return None;
    }
    Some(DraftDeliverable {
        id: input.id.unwrap_or_else(Uuid::new_v4),
        title,
        description: input.description.trim().to_string(),
    })
}

fn change_from(input: DraftChangeInput, now: &str) -> DraftChange {
    let summary = sanitize_text(&input.summary);
    DraftChange {
        id: input.id.unwrap_or_else(Uuid::new_v4),
        summary: if summary.is_empty() {
            "Inserted draft content".to_string()
        } else {
            summary
        },
        content: input.content.trim().to_string(),
        created_at: input.created_at.unwrap_or_else(|| now.to_string()),
        highlight: input.highlight,
        source_message_id: input.source_message_id,
    }
}

fn source_from(input: DraftSourceInput) -> DraftSource {
    DraftSource {
        id: input.id.unwrap_or_else(Uuid::new_v4),
        title: sanitize_text(&input.title),
        page: input.page,
        snippet: input.snippet,
    }
}

fn materialize(input: CreateDraft, now: String) -> Draft {
    let slug = input
        .slug
        .filter(|slug| !slug.trim().is_empty())
        .unwrap_or_else(|| slug_for(&input.file_name));
    Draft {
        id: Uuid::new_v4(),
        project_id: input.project_id,
        slug,
        pdf_id: input.pdf_id,
        title: input.title,
        status: input.status.unwrap_or(DraftStatus::Draft),
        sections: input.sections.into_iter().map(section_from).collect(),
        deliverables: input
            .deliverables
            .into_iter()
            .filter_map(deliverable_from)
            .collect(),
        llm_changes: input
            .llm_changes
            .into_iter()
            .map(|change| change_from(change, &now))
            .collect(),
        sources: input.sources.into_iter().map(source_from).collect(),
        version: 1,
        file_name: input.file_name,
        created_at: now.clone(),
        updated_at: now,
    }
}

impl DraftStore {
    pub fn new(enforce_unique_names: bool) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            enforce_unique_names,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create_draft(&self, input: CreateDraft) -> Result<Draft, ApiError> {
        let mut inner = self.lock();
        let key = (input.project_id, input.file_name.to_lowercase());
        if self.enforce_unique_names && inner.name_index.contains_key(&key) {
            return Err(file_conflict(&input.file_name));
        }
        let now = inner.stamper.next();
        let draft = materialize(input, now);
        inner
            .project_index
            .entry(draft.project_id)
            .or_default()
            .insert(draft.id);
        if self.enforce_unique_names {
            inner.name_index.insert(key, draft.id);
        }
        inner.drafts.insert(draft.id, draft.clone());
        info!(draft_id = %draft.id, project_id = %draft.project_id, "Draft created");
        Ok(draft)
    }

    pub fn get_draft(&self, id: Uuid) -> Result<Draft, ApiError> {
        self.lock()
            .drafts
            .get(&id)
            .cloned()
            .ok_or_else(draft_not_found)
    }

    /// Filters one project's drafts by status and a case-insensitive
    /// substring over file name, title, and section headings; newest first.
    /// Returns the requested page and the total filtered count.
    pub fn list_drafts(
        &self,
        project_id: Uuid,
        search: Option<&str>,
        status: Option<DraftStatus>,
        page: usize,
        limit: usize,
    ) -> (Vec<Draft>, usize) {
        let inner = self.lock();
        let needle = search
            .map(str::to_lowercase)
            .filter(|needle| !needle.is_empty());
        let mut results: Vec<Draft> = inner
            .project_index
            .get(&project_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.drafts.get(id))
                    .filter(|draft| {
                        if let Some(status) = status {
                            if draft.status != status {
                                return false;
                            }
                        }
                        match needle.as_deref() {
                            Some(needle) => {
                                draft.file_name.to_lowercase().contains(needle)
                                    || draft.title.to_lowercase().contains(needle)
                                    || draft
                                        .sections
                                        .iter()
                                        .any(|s| s.heading.to_lowercase().contains(needle))
                            }
                            None => true,
                        }
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        results.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        let total = results.len();
        let page_items = results
            .into_iter()
            .skip(page.saturating_sub(1) * limit)
            .take(limit)
            .collect();
        (page_items, total)
    }

    pub fn update_draft(&self, id: Uuid, update: UpdateDraft) -> Result<Draft, ApiError> {
        let mut inner = self.lock();
        let (project_id, current_file) = match inner.drafts.get(&id) {
            Some(draft) => (draft.project_id, draft.file_name.clone()),
            None => return Err(draft_not_found()),
        };

        if let Some(new_name) = update.file_name.as_ref() {
            let current_key = (project_id, current_file.to_lowercase());
            let new_key = (project_id, new_name.to_lowercase());
            if self.enforce_unique_names && new_key != current_key {
                if inner.name_index.contains_key(&new_key) {
                    return Err(file_conflict(new_name));
                }
                inner.name_index.remove(&current_key);
                inner.name_index.insert(new_key, id);
            }
        }

        let stamp = inner.stamper.next();
        let draft = inner.drafts.get_mut(&id).ok_or_else(draft_not_found)?;
        if let Some(new_name) = update.file_name {
            if new_name != draft.file_name {
                draft.slug = slug_for(&new_name);
                draft.file_name = new_name;
            }
        }
        if let Some(title) = update.title {
            draft.title = title;
        }
        if let Some(status) = update.status {
            draft.status = status;
        }
        if let Some(pdf_id) = update.pdf_id {
            draft.pdf_id = Some(pdf_id);
        }
        if let Some(sections) = update.sections {
            draft.sections = sections.into_iter().map(section_from).collect();
        }
        if let Some(deliverables) = update.deliverables {
            draft.deliverables = deliverables.into_iter().filter_map(deliverable_from).collect();
        }
        if let Some(changes) = update.llm_changes {
            draft.llm_changes = changes
                .into_iter()
                .map(|change| change_from(change, &stamp))
                .collect();
        }
        if let Some(sources) = update.sources {
            draft.sources = sources.into_iter().map(source_from).collect();
        }
        draft.version += 1;
        draft.updated_at = stamp;
        info!(draft_id = %id, "Draft updated");
        Ok(draft.clone())
    }

    /// Conflict-checked creation into the archive map. The record is a
    /// distinct object with its own id, unlinked from any live draft.
    pub fn archive_draft(&self, input: CreateDraft) -> Result<Draft, ApiError> {
        let mut inner = self.lock();
        let key = (input.project_id, input.file_name.to_lowercase());
        if self.enforce_unique_names && inner.archive_name_index.contains_key(&key) {
            return Err(file_conflict(&input.file_name));
        }
        let now = inner.stamper.next();
        let draft = materialize(input, now);
        if self.enforce_unique_names {
            inner.archive_name_index.insert(key, draft.id);
        }
        inner.archived.insert(draft.id, draft.clone());
        info!(draft_id = %draft.id, project_id = %draft.project_id, "Draft archived");
        Ok(draft)
    }

    /// Primary-then-archive lookup, tolerating either store holding the id.
    pub fn get_archived(&self, id: Uuid) -> Result<Draft, ApiError> {
        let inner = self.lock();
        inner
            .drafts
            .get(&id)
            .or_else(|| inner.archived.get(&id))
            .cloned()
            .ok_or_else(|| ApiError::NotFound("Archived draft not found.".to_string()))
    }

    /// Process-wide teardown.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.drafts.clear();
        inner.project_index.clear();
        inner.name_index.clear();
        inner.archived.clear();
        inner.archive_name_index.clear();
    }
}

/// Slug for a draft: lowercased alphanumeric stem with dash separators plus
/// a fixed FNV-1a suffix over the full file name. Deterministic across
/// processes, unlike the std hasher.
fn slug_for(file_name: &str) -> String {
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);
    let mut slug = String::with_capacity(stem.len());
    let mut prev_dash = true;
    for ch in stem.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("draft");
    }
    format!("{slug}-{:08x}", fnv1a(file_name.as_bytes()) as u32)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(project_id: Uuid, file_name: &str, title: &str) -> CreateDraft {
        CreateDraft {
            project_id,
            file_name: file_name.to_string(),
            title: title.to_string(),
            status: None,
            pdf_id: None,
            slug: None,
            sections: Vec::new(),
            deliverables: Vec::new(),
            llm_changes: Vec::new(),
            sources: Vec::new(),
        }
    }

    #[test]
    fn test_create_rejects_duplicate_file_name_in_project() {
        let store = DraftStore::new(true);
        let project = Uuid::new_v4();
        store.create_draft(input(project, "rfp.pdf", "First")).unwrap();
        let err = store
            .create_draft(input(project, "RFP.PDF", "Second"))
            .unwrap_err();
        match err {
            ApiError::Conflict { suggested_name, .. } => {
                assert_eq!(suggested_name, "RFP_2.PDF");
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        // A different project is free to reuse the name.
        store
            .create_draft(input(Uuid::new_v4(), "rfp.pdf", "Other project"))
            .unwrap();
    }

    #[test]
    fn test_flag_off_allows_duplicates() {
        let store = DraftStore::new(false);
        let project = Uuid::new_v4();
        store.create_draft(input(project, "rfp.pdf", "First")).unwrap();
        store.create_draft(input(project, "rfp.pdf", "Second")).unwrap();
        let (page, total) = store.list_drafts(project, None, None, 1, 20);
        assert_eq!(total, 2);
        assert_eq!(page.len(), 2);
    }

    #[test]
    fn test_slug_is_deterministic_and_derived_from_file_name() {
        let a = slug_for("Security Proposal v2.pdf");
        let b = slug_for("Security Proposal v2.pdf");
        assert_eq!(a, b);
        assert!(a.starts_with("security-proposal-v2-"));
        assert_ne!(slug_for("a.pdf"), slug_for("b.pdf"));
    }

    #[test]
    fn test_slug_survives_degenerate_names() {
        assert!(slug_for("....pdf").starts_with("draft-"));
        assert!(slug_for("???").starts_with("draft-"));
    }

    #[test]
    fn test_rename_regenerates_slug_and_moves_index() {
        let store = DraftStore::new(true);
        let project = Uuid::new_v4();
        let draft = store.create_draft(input(project, "old.pdf", "Doc")).unwrap();
        let updated = store
            .update_draft(
                draft.id,
                UpdateDraft {
                    file_name: Some("new.pdf".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_ne!(updated.slug, draft.slug);
        assert_eq!(updated.version, 2);
        assert!(updated.updated_at > draft.updated_at);
        // Old name is free again; new name now collides.
        store.create_draft(input(project, "old.pdf", "Reuse")).unwrap();
        assert!(matches!(
            store.create_draft(input(project, "new.pdf", "Clash")),
            Err(ApiError::Conflict { .. })
        ));
    }

    #[test]
    fn test_rename_conflict_keeps_draft_unchanged() {
        let store = DraftStore::new(true);
        let project = Uuid::new_v4();
        store.create_draft(input(project, "taken.pdf", "A")).unwrap();
        let draft = store.create_draft(input(project, "mine.pdf", "B")).unwrap();
        let err = store
            .update_draft(
                draft.id,
                UpdateDraft {
                    file_name: Some("taken.pdf".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict { .. }));
        assert_eq!(store.get_draft(draft.id).unwrap().file_name, "mine.pdf");
    }

    #[test]
    fn test_list_filters_by_status_and_search() {
        let store = DraftStore::new(true);
        let project = Uuid::new_v4();
        let mut final_draft = input(project, "alpha.pdf", "Network security plan");
        final_draft.status = Some(DraftStatus::Final);
        store.create_draft(final_draft).unwrap();
        let mut with_section = input(project, "beta.pdf", "Beta");
        with_section.sections = vec![DraftSectionInput {
            id: None,
            heading: "Incident Response".to_string(),
            body: "body".to_string(),
        }];
        store.create_draft(with_section).unwrap();

        let (_, total_final) = store.list_drafts(project, None, Some(DraftStatus::Final), 1, 20);
        assert_eq!(total_final, 1);

        // Matches the section heading, case-insensitively.
        let (hits, total) = store.list_drafts(project, Some("incident"), None, 1, 20);
        assert_eq!(total, 1);
        assert_eq!(hits[0].file_name, "beta.pdf");

        let (hits, _) = store.list_drafts(project, Some("NETWORK"), None, 1, 20);
        assert_eq!(hits[0].file_name, "alpha.pdf");

        let (none, total_none) = store.list_drafts(project, Some("zzz"), None, 1, 20);
        assert!(none.is_empty());
        assert_eq!(total_none, 0);
    }

    #[test]
    fn test_list_paginates_with_full_total() {
        let store = DraftStore::new(true);
        let project = Uuid::new_v4();
        for i in 0..5 {
            store
                .create_draft(input(project, &format!("doc{i}.pdf"), "Doc"))
                .unwrap();
        }
        let (page1, total) = store.list_drafts(project, None, None, 1, 2);
        assert_eq!(total, 5);
        assert_eq!(page1.len(), 2);
        let (page3, _) = store.list_drafts(project, None, None, 3, 2);
        assert_eq!(page3.len(), 1);
        // Newest first: page 1 starts with the last-created draft.
        assert_eq!(page1[0].file_name, "doc4.pdf");
    }

    #[test]
    fn test_archive_is_a_separate_store() {
        let store = DraftStore::new(true);
        let project = Uuid::new_v4();
        let live = store.create_draft(input(project, "live.pdf", "Live")).unwrap();
        let archived = store
            .archive_draft(input(project, "live.pdf", "Archived copy"))
            .unwrap();
        // Same file name is fine: the archive has its own name index.
        assert_ne!(live.id, archived.id);
        // The archived record is not listed with live drafts.
        let (_, total) = store.list_drafts(project, None, None, 1, 20);
        assert_eq!(total, 1);
        // get_archived falls back from primary to archive.
        assert_eq!(store.get_archived(live.id).unwrap().id, live.id);
        assert_eq!(store.get_archived(archived.id).unwrap().id, archived.id);
        assert!(matches!(
            store.get_archived(Uuid::new_v4()),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn test_archive_conflict_checks_archive_index() {
        let store = DraftStore::new(true);
        let project = Uuid::new_v4();
        store
            .archive_draft(input(project, "final.pdf", "v1"))
            .unwrap();
        assert!(matches!(
            store.archive_draft(input(project, "final.pdf", "v2")),
            Err(ApiError::Conflict { .. })
        ));
    }

    #[test]
    fn test_supplied_slug_wins_over_generated() {
        let store = DraftStore::new(true);
        let project = Uuid::new_v4();
        let mut create = input(project, "doc.pdf", "Doc");
        create.slug = Some("custom-handle".to_string());
        let draft = store.create_draft(create).unwrap();
        assert_eq!(draft.slug, "custom-handle");
    }

    #[test]
    fn test_clear_resets_everything() {
        let store = DraftStore::new(true);
        let project = Uuid::new_v4();
        let draft = store.create_draft(input(project, "doc.pdf", "Doc")).unwrap();
        store.archive_draft(input(project, "arch.pdf", "A")).unwrap();
        store.clear();
        assert!(matches!(store.get_draft(draft.id), Err(ApiError::NotFound(_))));
        let (_, total) = store.list_drafts(project, None, None, 1, 20);
        assert_eq!(total, 0);
        // Names are free again.
        store.create_draft(input(project, "doc.pdf", "Doc")).unwrap();
        store.archive_draft(input(project, "arch.pdf", "A")).unwrap();
    }
}
