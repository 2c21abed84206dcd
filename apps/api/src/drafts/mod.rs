// Draft domain: the per-project draft store, its archive, and handlers.
// Independent of the run domain; the two archive models are deliberately
// different (drafts archive as standalone records, runs as snapshots).

pub mod handlers;
pub mod models;
pub mod store;
