//! Document type registry
//!
//! Each document type (RFC, PRD, ...) knows how to turn a projection into the
//! type-specific rows of its header. The registry is built once at startup and
//! handed to the components that rewrite headers.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::AppError;
use crate::models::{CustomFieldType, DocumentType};
use crate::projection::{CustomFieldValue, SearchDocument};

/// One labelled cell of a document header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    pub label: String,
    pub value: String,
}

impl HeaderField {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Type-specific knowledge about a document template.
pub trait DocumentTypeParser: Send + Sync {
    /// Document type name as stored on documents (e.g. "RFC").
    fn name(&self) -> &str;

    /// Header fields rendered after the common ones.
    fn header_fields(&self, doc: &SearchDocument) -> Vec<HeaderField>;

    /// Check that the projection's custom fields match what the type declares.
    fn validate(&self, _doc: &SearchDocument) -> Result<(), AppError> {
        Ok(())
    }
}

/// Parser driven by the custom-field schema stored with the document type.
#[derive(Debug, Clone)]
pub struct SchemaDocumentType {
    doc_type: DocumentType,
}

impl SchemaDocumentType {
    pub fn new(doc_type: DocumentType) -> Self {
        Self { doc_type }
    }
}

impl DocumentTypeParser for SchemaDocumentType {
    fn name(&self) -> &str {
        &self.doc_type.name
    }

    fn header_fields(&self, doc: &SearchDocument) -> Vec<HeaderField> {
        self.doc_type
            .custom_fields
            .iter()
            .map(|field| {
                let value = doc
                    .custom_fields
                    .get(&field.key())
                    .map(CustomFieldValue::display)
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| "N/A".to_string());
                HeaderField::new(field.name.clone(), value)
            })
            .collect()
    }

    fn validate(&self, doc: &SearchDocument) -> Result<(), AppError> {
        for field in &self.doc_type.custom_fields {
            let key = field.key();
            let Some(value) = doc.custom_fields.get(&key) else {
                continue;
            };
            let matches = match (&field.field_type, value) {
                (CustomFieldType::People, CustomFieldValue::People(_)) => true,
                (CustomFieldType::String | CustomFieldType::Person, CustomFieldValue::Text(_)) => {
                    true
                }
                (CustomFieldType::Other(kind), _) => {
                    return Err(AppError::validation(format!(
                        "unknown type for custom field key {:?}: {}",
                        key, kind
                    )))
                }
                _ => false,
            };
            if !matches {
                return Err(AppError::validation(format!(
                    "wrong type for custom field key {:?}, want {}",
                    key,
                    field.field_type.as_str()
                )));
            }
        }
        Ok(())
    }
}

/// Lookup of document type parsers by name.
#[derive(Clone, Default)]
pub struct DocumentTypeRegistry {
    parsers: HashMap<String, Arc<dyn DocumentTypeParser>>,
}

impl DocumentTypeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a schema-driven parser for every given document type.
    pub fn from_document_types(types: impl IntoIterator<Item = DocumentType>) -> Self {
        let mut registry = Self::new();
        for doc_type in types {
            registry.register(Arc::new(SchemaDocumentType::new(doc_type)));
        }
        registry
    }

    /// Register a parser, replacing any previous parser for the same type.
    pub fn register(&mut self, parser: Arc<dyn DocumentTypeParser>) {
        self.parsers.insert(parser.name().to_lowercase(), parser);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn DocumentTypeParser>, AppError> {
        self.parsers
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("invalid doc type: {}", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parsers.contains_key(&name.to_lowercase())
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.parsers.values().map(|p| p.name().to_string()).collect();
        names.sort();
        names
    }
}
