//! In-memory relational store for tests
//!
//! Implements [`DocumentStore`] and [`WatermarkStore`] over shared maps so that
//! services can be exercised without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docflow_core::models::{
    Document, DocumentFileRevision, DocumentReview, DocumentStatus, DocumentType, FolderKind,
    IndexerFolder, NewFileRevision, PublicationRecord, ReviewStatus,
};
use docflow_core::AppError;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::store_traits::{DocumentStore, WatermarkStore};

#[derive(Clone, Default)]
#[allow(clippy::type_complexity)]
pub struct InMemoryDocumentStore {
    documents: Arc<Mutex<HashMap<String, Document>>>,
    document_types: Arc<Mutex<HashMap<String, DocumentType>>>,
    reviews: Arc<Mutex<HashMap<(Uuid, String), DocumentReview>>>,
    counters: Arc<Mutex<HashMap<(Uuid, Uuid), i32>>>,
    folders: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
    last_full_index: Arc<Mutex<Option<DateTime<Utc>>>>,
    writes: Arc<Mutex<Vec<String>>>,
    failures: Arc<Mutex<HashSet<String>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document, registering its document type as well.
    pub fn add_document(&self, document: Document) {
        self.add_document_type(document.document_type.clone());
        self.documents
            .lock()
            .unwrap()
            .insert(document.google_file_id.clone(), document);
    }

    pub fn add_document_type(&self, document_type: DocumentType) {
        self.document_types
            .lock()
            .unwrap()
            .insert(document_type.name.to_lowercase(), document_type);
    }

    pub fn add_review(&self, review: DocumentReview) {
        self.reviews
            .lock()
            .unwrap()
            .insert((review.document_id, review.user_email.clone()), review);
    }

    pub fn document(&self, google_file_id: &str) -> Option<Document> {
        self.documents.lock().unwrap().get(google_file_id).cloned()
    }

    pub fn reviews(&self, document_id: Uuid) -> Vec<DocumentReview> {
        let mut reviews: Vec<DocumentReview> = self
            .reviews
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.document_id == document_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| a.user_email.cmp(&b.user_email));
        reviews
    }

    pub fn watermark(&self, key: &str) -> Option<DateTime<Utc>> {
        self.folders.lock().unwrap().get(key).copied()
    }

    /// Names of the write operations performed so far, in order.
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    /// Make every subsequent call of `operation` fail.
    pub fn fail_on(&self, operation: &str) {
        self.failures.lock().unwrap().insert(operation.to_string());
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    fn check(&self, operation: &str) -> Result<(), AppError> {
        if self.failures.lock().unwrap().contains(operation) {
            return Err(AppError::Internal(format!(
                "injected failure in {}",
                operation
            )));
        }
        Ok(())
    }

    fn record_write(&self, operation: &str) {
        self.writes.lock().unwrap().push(operation.to_string());
    }

    fn update_document<T>(
        &self,
        google_file_id: &str,
        f: impl FnOnce(&mut Document) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let mut documents = self.documents.lock().unwrap();
        let document = documents.get_mut(google_file_id).ok_or_else(|| {
            AppError::not_found(format!("document {} not found", google_file_id))
        })?;
        f(document)
    }

    fn document_id_exists(&self, document_id: Uuid) -> bool {
        self.documents
            .lock()
            .unwrap()
            .values()
            .any(|d| d.id == document_id)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get_document(&self, google_file_id: &str) -> Result<Option<Document>, AppError> {
        self.check("get_document")?;
        Ok(self.document(google_file_id))
    }

    async fn get_reviews(&self, document_id: Uuid) -> Result<Vec<DocumentReview>, AppError> {
        self.check("get_reviews")?;
        Ok(self.reviews(document_id))
    }

    async fn get_document_type(&self, name: &str) -> Result<Option<DocumentType>, AppError> {
        self.check("get_document_type")?;
        Ok(self
            .document_types
            .lock()
            .unwrap()
            .get(&name.to_lowercase())
            .cloned())
    }

    async fn list_document_types(&self) -> Result<Vec<DocumentType>, AppError> {
        self.check("list_document_types")?;
        let mut types: Vec<DocumentType> =
            self.document_types.lock().unwrap().values().cloned().collect();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(types)
    }

    async fn set_locked(&self, google_file_id: &str, locked: bool) -> Result<(), AppError> {
        self.check("set_locked")?;
        self.update_document(google_file_id, |d| {
            d.locked = locked;
            Ok(())
        })?;
        self.record_write("set_locked");
        Ok(())
    }

    async fn set_modified_at(
        &self,
        google_file_id: &str,
        modified_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.check("set_modified_at")?;
        self.update_document(google_file_id, |d| {
            d.document_modified_at = modified_at;
            Ok(())
        })?;
        self.record_write("set_modified_at");
        Ok(())
    }

    async fn find_locked(&self, folder: FolderKind) -> Result<Vec<String>, AppError> {
        self.check("find_locked")?;
        let mut ids: Vec<String> = self
            .documents
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.locked)
            .filter(|d| match folder {
                FolderKind::Drafts => d.status == DocumentStatus::Wip,
                FolderKind::Documents => d.status != DocumentStatus::Wip,
            })
            .map(|d| d.google_file_id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn next_document_number(
        &self,
        product_id: Uuid,
        document_type_id: Uuid,
    ) -> Result<i32, AppError> {
        self.check("next_document_number")?;
        let mut counters = self.counters.lock().unwrap();
        let counter = counters.entry((product_id, document_type_id)).or_insert(0);
        *counter += 1;
        let next = *counter;
        drop(counters);
        self.record_write("next_document_number");
        Ok(next)
    }

    async fn record_publication(
        &self,
        google_file_id: &str,
        record: &PublicationRecord,
    ) -> Result<(), AppError> {
        self.check("record_publication")?;
        self.update_document(google_file_id, |d| {
            if d.status != DocumentStatus::Wip {
                return Err(AppError::validation(format!(
                    "document {} is no longer a draft",
                    google_file_id
                )));
            }
            d.status = DocumentStatus::InReview;
            d.document_number = record.document_number;
            d.document_created_at = record.document_created_at;
            d.document_modified_at = record.document_modified_at;
            d.file_revisions.push(DocumentFileRevision {
                document_id: d.id,
                google_drive_file_revision_id: record.revision.revision_id.clone(),
                name: record.revision.name.clone(),
                created_at: Utc::now(),
            });
            Ok(())
        })?;
        self.record_write("record_publication");
        Ok(())
    }

    async fn add_file_revision(
        &self,
        document_id: Uuid,
        revision: &NewFileRevision,
    ) -> Result<(), AppError> {
        self.check("add_file_revision")?;
        let mut documents = self.documents.lock().unwrap();
        let document = documents
            .values_mut()
            .find(|d| d.id == document_id)
            .ok_or_else(|| AppError::not_found(format!("document {} not found", document_id)))?;
        document.file_revisions.push(DocumentFileRevision {
            document_id,
            google_drive_file_revision_id: revision.revision_id.clone(),
            name: revision.name.clone(),
            created_at: Utc::now(),
        });
        drop(documents);
        self.record_write("add_file_revision");
        Ok(())
    }

    async fn upsert_review(
        &self,
        document_id: Uuid,
        user_email: &str,
        status: ReviewStatus,
    ) -> Result<DocumentReview, AppError> {
        self.check("upsert_review")?;
        if !self.document_id_exists(document_id) {
            return Err(AppError::not_found(format!(
                "document {} not found",
                document_id
            )));
        }
        let review = DocumentReview {
            document_id,
            user_email: user_email.to_string(),
            status,
            updated_at: Utc::now(),
        };
        self.add_review(review.clone());
        self.record_write("upsert_review");
        Ok(review)
    }
}

#[async_trait]
impl WatermarkStore for InMemoryDocumentStore {
    async fn folder_watermark(&self, key: &str) -> Result<Option<DateTime<Utc>>, AppError> {
        self.check("folder_watermark")?;
        Ok(self.watermark(key))
    }

    async fn set_folder_watermark(&self, key: &str, at: DateTime<Utc>) -> Result<(), AppError> {
        self.check("set_folder_watermark")?;
        self.folders.lock().unwrap().insert(key.to_string(), at);
        Ok(())
    }

    async fn last_full_index(&self) -> Result<Option<DateTime<Utc>>, AppError> {
        self.check("last_full_index")?;
        Ok(*self.last_full_index.lock().unwrap())
    }

    async fn set_last_full_index(&self, at: DateTime<Utc>) -> Result<(), AppError> {
        self.check("set_last_full_index")?;
        *self.last_full_index.lock().unwrap() = Some(at);
        Ok(())
    }

    async fn list_folders(&self) -> Result<Vec<IndexerFolder>, AppError> {
        self.check("list_folders")?;
        let mut folders: Vec<IndexerFolder> = self
            .folders
            .lock()
            .unwrap()
            .iter()
            .map(|(id, at)| IndexerFolder {
                google_drive_id: id.clone(),
                last_indexed_at: *at,
            })
            .collect();
        folders.sort_by(|a, b| a.google_drive_id.cmp(&b.google_drive_id));
        Ok(folders)
    }
}
