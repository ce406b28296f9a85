//! Docflow Core Library
//!
//! This crate provides the document lifecycle domain models, error types,
//! configuration, the search projection schema and the document type registry
//! shared across all docflow components.

pub mod config;
pub mod constants;
pub mod doc_types;
pub mod error;
pub mod models;
pub mod projection;

// Re-export commonly used types
pub use config::{BaseConfig, Config, DocflowConfig, FolderConfig, IndexerSettings};
pub use doc_types::{DocumentTypeParser, DocumentTypeRegistry, HeaderField, SchemaDocumentType};
pub use error::{
    AppError, CompensationFailures, ConsistencyReport, Divergence, ErrorMetadata, LogLevel,
};
pub use projection::{Collection, CustomFieldValue, LinkData, SearchDocument};
