//! Docflow Storage Library
//!
//! This crate provides the two provider abstractions the document lifecycle talks
//! to: [`DocumentStorage`], the file store that owns document bodies and
//! revisions, and [`SearchIndex`], the `drafts`/`docs` collections of search
//! projections plus the short-link collection.
//!
//! [`PgSearchIndex`] stores the index in Postgres. In-memory implementations of
//! both traits live in `test_helpers`, behind the `test-helpers` feature.

pub mod body;
pub mod postgres_search;
pub mod search;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
pub mod traits;

// Re-export commonly used types
pub use body::{DocBody, DocEdit, HeaderRow};
pub use postgres_search::PgSearchIndex;
pub use search::{SearchError, SearchIndex, SearchResult};
pub use traits::{
    DocumentStorage, DriveFile, Permission, Revision, ShareRole, StorageError, StorageResult,
};
