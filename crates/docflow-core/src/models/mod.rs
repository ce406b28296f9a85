//! Data models for the document lifecycle
//!
//! Relational records (documents, reviews, pinned revisions, indexer watermarks)
//! as the rest of the workspace sees them.

mod document;
mod file_revision;
mod indexer;
mod review;

pub use document::*;
pub use file_revision::*;
pub use indexer::*;
pub use review::*;
