//! Docflow Database Layer
//!
//! This crate provides the Postgres repositories behind the document lifecycle
//! and the store traits the services depend on.
//!
// Module declarations
pub mod db;
pub mod store_traits;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

// Re-exports: Repositories
pub use db::{
    DocumentRepository, DocumentTypeRepository, FileRevisionRepository, IndexerRepository,
    ProductNumberRepository, ReviewRepository,
};

// Re-exports: Transaction utilities
pub use db::transaction::TransactionGuard;

// Re-exports: Store traits
pub use store_traits::{DocumentStore, PgDocumentStore, WatermarkStore};
