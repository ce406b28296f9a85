//! Test helpers
//!
//! In-memory implementations of [`DocumentStorage`](crate::DocumentStorage) and
//! [`SearchIndex`](crate::SearchIndex) for tests that must not touch a real
//! provider.

mod memory_search;
mod memory_storage;

pub use memory_search::InMemorySearchIndex;
pub use memory_storage::InMemoryDocumentStorage;
