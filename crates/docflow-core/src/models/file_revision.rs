use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A storage revision that was pinned, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DocumentFileRevision {
    pub document_id: Uuid,
    pub google_drive_file_revision_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A revision row to append, before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFileRevision {
    pub revision_id: String,
    pub name: String,
}

impl NewFileRevision {
    pub fn new(revision_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            revision_id: revision_id.into(),
            name: name.into(),
        }
    }
}

/// Relational changes committed when a document enters review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicationRecord {
    pub document_number: i32,
    pub document_created_at: DateTime<Utc>,
    pub document_modified_at: DateTime<Utc>,
    pub revision: NewFileRevision,
}
