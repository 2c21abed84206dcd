// Proposal run domain: the run store with its indexes and archive, the
// section composer, and the route handlers. LLM calls go through the
// assistant; nothing here talks to the provider directly.

pub mod compose;
pub mod handlers;
pub mod models;
pub mod store;
