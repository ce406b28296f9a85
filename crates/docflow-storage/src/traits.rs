//! Document storage provider abstraction
//!
//! This module defines the [`DocumentStorage`] trait through which the lifecycle
//! manipulates the underlying files: moving them between folders, pinning
//! revisions, rewriting headers and exporting their text.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docflow_core::AppError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::body::{DocBody, DocEdit};

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// File metadata as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub parents: Vec<String>,
    pub modified_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub id: String,
    pub modified_time: DateTime<Utc>,
    pub keep_forever: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareRole {
    Reader,
    Commenter,
    Writer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: String,
    pub email_address: String,
    pub role: ShareRole,
}

pub const GOOGLE_DOC_MIME_TYPE: &str = "application/vnd.google-apps.document";
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
pub const SHORTCUT_MIME_TYPE: &str = "application/vnd.google-apps.shortcut";
pub const PLAIN_TEXT_MIME_TYPE: &str = "text/plain";

/// Document storage provider.
///
/// Implementations talk to the file store that owns the document bodies. All
/// identifiers are opaque provider ids.
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    async fn get_file(&self, file_id: &str) -> StorageResult<DriveFile>;

    /// Copy a file into a folder under a new name.
    async fn copy_file(
        &self,
        file_id: &str,
        name: &str,
        dest_folder_id: &str,
    ) -> StorageResult<DriveFile>;

    /// Move a file so that `dest_folder_id` is its only parent.
    async fn move_file(&self, file_id: &str, dest_folder_id: &str) -> StorageResult<DriveFile>;

    async fn rename_file(&self, file_id: &str, name: &str) -> StorageResult<()>;

    async fn share_file(&self, file_id: &str, email: &str, role: ShareRole) -> StorageResult<()>;

    async fn share_file_with_domain(
        &self,
        file_id: &str,
        domain: &str,
        role: ShareRole,
    ) -> StorageResult<()>;

    async fn list_permissions(&self, file_id: &str) -> StorageResult<Vec<Permission>>;

    async fn delete_permission(&self, file_id: &str, permission_id: &str) -> StorageResult<()>;

    async fn delete_file(&self, file_id: &str) -> StorageResult<()>;

    /// Structured body of a document.
    async fn get_doc(&self, file_id: &str) -> StorageResult<DocBody>;

    /// Apply a batch of structural edits to a document body.
    async fn update_doc(&self, file_id: &str, edits: Vec<DocEdit>) -> StorageResult<()>;

    async fn get_latest_revision(&self, file_id: &str) -> StorageResult<Revision>;

    /// Pin (or unpin) a revision so the provider never garbage-collects it.
    async fn keep_revision_forever(
        &self,
        file_id: &str,
        revision_id: &str,
        keep: bool,
    ) -> StorageResult<Revision>;

    /// Export a document body in the given MIME type (e.g. `text/plain`).
    async fn export_body(&self, file_id: &str, mime_type: &str) -> StorageResult<String>;

    /// Documents in a folder modified in `(from, until]`.
    async fn get_updated_docs_between(
        &self,
        folder_id: &str,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> StorageResult<Vec<DriveFile>>;

    /// Subfolder of `parent_id` with the given name, created when missing.
    async fn get_or_create_subfolder(&self, parent_id: &str, name: &str)
        -> StorageResult<DriveFile>;

    /// Create a shortcut to `target_file_id` inside `parent_folder_id`.
    async fn create_shortcut(
        &self,
        target_file_id: &str,
        parent_folder_id: &str,
    ) -> StorageResult<DriveFile>;
}
