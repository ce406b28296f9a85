//! Relational store abstractions
//!
//! These traits are the narrow interface the lifecycle services need from the
//! relational database, so they can run against [`PgDocumentStore`] in production
//! and an in-memory store in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docflow_core::models::{
    Document, DocumentReview, DocumentType, FolderKind, IndexerFolder, NewFileRevision,
    PublicationRecord, ReviewStatus,
};
use docflow_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{
    DocumentRepository, DocumentTypeRepository, IndexerRepository, ProductNumberRepository,
    ReviewRepository,
};

/// Document, review and counter operations
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Document by storage file id, with all associations loaded
    async fn get_document(&self, google_file_id: &str) -> Result<Option<Document>, AppError>;

    async fn get_reviews(&self, document_id: Uuid) -> Result<Vec<DocumentReview>, AppError>;

    async fn get_document_type(&self, name: &str) -> Result<Option<DocumentType>, AppError>;

    async fn list_document_types(&self) -> Result<Vec<DocumentType>, AppError>;

    /// Persist the lock flag. No other column is written.
    async fn set_locked(&self, google_file_id: &str, locked: bool) -> Result<(), AppError>;

    async fn set_modified_at(
        &self,
        google_file_id: &str,
        modified_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// Storage ids of locked documents that belong to the given folder
    async fn find_locked(&self, folder: FolderKind) -> Result<Vec<String>, AppError>;

    /// Allocate and commit the next number for a (product, document type) pair
    async fn next_document_number(
        &self,
        product_id: Uuid,
        document_type_id: Uuid,
    ) -> Result<i32, AppError>;

    /// Atomically move a WIP document into review
    async fn record_publication(
        &self,
        google_file_id: &str,
        record: &PublicationRecord,
    ) -> Result<(), AppError>;

    async fn add_file_revision(
        &self,
        document_id: Uuid,
        revision: &NewFileRevision,
    ) -> Result<(), AppError>;

    async fn upsert_review(
        &self,
        document_id: Uuid,
        user_email: &str,
        status: ReviewStatus,
    ) -> Result<DocumentReview, AppError>;
}

/// Indexer watermark operations
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    async fn folder_watermark(&self, key: &str) -> Result<Option<DateTime<Utc>>, AppError>;

    async fn set_folder_watermark(&self, key: &str, at: DateTime<Utc>) -> Result<(), AppError>;

    async fn last_full_index(&self) -> Result<Option<DateTime<Utc>>, AppError>;

    async fn set_last_full_index(&self, at: DateTime<Utc>) -> Result<(), AppError>;

    async fn list_folders(&self) -> Result<Vec<IndexerFolder>, AppError>;
}

/// [`DocumentStore`] over the Postgres repositories
#[derive(Clone)]
pub struct PgDocumentStore {
    documents: DocumentRepository,
    reviews: ReviewRepository,
    numbers: ProductNumberRepository,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            documents: DocumentRepository::new(pool.clone()),
            reviews: ReviewRepository::new(pool.clone()),
            numbers: ProductNumberRepository::new(pool),
        }
    }

    fn document_types(&self) -> &DocumentTypeRepository {
        self.documents.document_types()
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get_document(&self, google_file_id: &str) -> Result<Option<Document>, AppError> {
        self.documents.get_by_google_file_id(google_file_id).await
    }

    async fn get_reviews(&self, document_id: Uuid) -> Result<Vec<DocumentReview>, AppError> {
        self.reviews.list_for_document(document_id).await
    }

    async fn get_document_type(&self, name: &str) -> Result<Option<DocumentType>, AppError> {
        self.document_types().get_by_name(name).await
    }

    async fn list_document_types(&self) -> Result<Vec<DocumentType>, AppError> {
        self.document_types().list().await
    }

    async fn set_locked(&self, google_file_id: &str, locked: bool) -> Result<(), AppError> {
        self.documents.set_locked(google_file_id, locked).await
    }

    async fn set_modified_at(
        &self,
        google_file_id: &str,
        modified_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.documents
            .set_modified_at(google_file_id, modified_at)
            .await
    }

    async fn find_locked(&self, folder: FolderKind) -> Result<Vec<String>, AppError> {
        self.documents.find_locked(folder).await
    }

    async fn next_document_number(
        &self,
        product_id: Uuid,
        document_type_id: Uuid,
    ) -> Result<i32, AppError> {
        self.numbers
            .next_document_number(product_id, document_type_id)
            .await
    }

    async fn record_publication(
        &self,
        google_file_id: &str,
        record: &PublicationRecord,
    ) -> Result<(), AppError> {
        self.documents
            .record_publication(google_file_id, record)
            .await
    }

    async fn add_file_revision(
        &self,
        document_id: Uuid,
        revision: &NewFileRevision,
    ) -> Result<(), AppError> {
        self.documents
            .file_revisions()
            .create(document_id, revision)
            .await
    }

    async fn upsert_review(
        &self,
        document_id: Uuid,
        user_email: &str,
        status: ReviewStatus,
    ) -> Result<DocumentReview, AppError> {
        self.reviews.upsert(document_id, user_email, status).await
    }
}

#[async_trait]
impl WatermarkStore for IndexerRepository {
    async fn folder_watermark(&self, key: &str) -> Result<Option<DateTime<Utc>>, AppError> {
        Ok(self.get_folder(key).await?.map(|f| f.last_indexed_at))
    }

    async fn set_folder_watermark(&self, key: &str, at: DateTime<Utc>) -> Result<(), AppError> {
        self.upsert_folder(key, at).await
    }

    async fn last_full_index(&self) -> Result<Option<DateTime<Utc>>, AppError> {
        Ok(self.get_metadata().await?.map(|m| m.last_full_index_at))
    }

    async fn set_last_full_index(&self, at: DateTime<Utc>) -> Result<(), AppError> {
        self.upsert_metadata(at).await
    }

    async fn list_folders(&self) -> Result<Vec<IndexerFolder>, AppError> {
        IndexerRepository::list_folders(self).await
    }
}
