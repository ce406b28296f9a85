//! Database repositories for the data access layer
//!
//! Repositories are organized into lifecycle/ (documents, types, reviews,
//! revisions, number counters) and the indexer watermark tables. Each repository
//! owns a pool handle and maps rows into `docflow_core` models.
//
// Document lifecycle repositories
pub mod lifecycle;
//
// Indexer watermarks
pub mod indexer;
//
// Transaction utilities
pub mod transaction;

pub use indexer::IndexerRepository;
pub use lifecycle::{
    DocumentRepository, DocumentTypeRepository, FileRevisionRepository,
    ProductNumberRepository, ReviewRepository,
};
