//! Section composer: pure derivations over a run's owned collections.
//!
//! `compose` joins ordered sections into one document string; `export_ready`
//! is the gate for POST /runs/:id/export. Both are recomputed on demand and
//! never cached.

use crate::runs::models::{Deliverable, DeliverableStatus, Section};

/// Joins sections into a single document.
///
/// Sections are sorted by `order` ascending (stable, so ties keep their array
/// position). A section with a non-empty heading renders as
/// `## {heading}\n{content}`; otherwise just its trimmed content. Empty
/// renderings are dropped, the rest joined with a blank line. Composing the
/// same input twice yields byte-identical output.
pub fn compose(sections: &[Section]) -> String {
    let mut ordered: Vec<&Section> = sections.iter().collect();
    ordered.sort_by_key(|section| section.order);

    let rendered: Vec<String> = ordered
        .iter()
        .map(|section| {
            let content = section.content.trim();
            if section.heading.is_empty() {
                content.to_string()
            } else {
                format!("## {}\n{}", section.heading, content)
            }
        })
        .filter(|block| !block.is_empty())
        .collect();

    rendered.join("\n\n").trim().to_string()
}

/// True iff the run can be exported: at least one deliverable, every
/// deliverable done, and every checklist item inside each of them done.
pub fn export_ready(deliverables: &[Deliverable]) -> bool {
    !deliverables.is_empty()
        && deliverables.iter().all(|deliverable| {
            deliverable.status == DeliverableStatus::Done
                && deliverable.checklist_items.iter().all(|item| item.done)
        })
}
