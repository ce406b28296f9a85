//! Fixtures for indexer integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use docflow_core::models::{Document, DocumentStatus, DocumentType, Product, User};
use docflow_core::{Collection, DocumentTypeRegistry, FolderConfig, IndexerSettings, SearchDocument};
use docflow_db::test_helpers::InMemoryDocumentStore;
use docflow_services::HeaderRenderer;
use docflow_storage::body::DocBody;
use docflow_storage::test_helpers::{InMemoryDocumentStorage, InMemorySearchIndex};
use docflow_worker::{HeaderRefresher, Indexer, IndexerConfig};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const DRAFTS_FOLDER: &str = "drafts-folder";
pub const DOCS_FOLDER: &str = "docs-folder";

pub struct TestEnv {
    pub store: InMemoryDocumentStore,
    pub storage: InMemoryDocumentStorage,
    pub search: InMemorySearchIndex,
    pub document_type: DocumentType,
    pub product: Product,
}

/// Reference "current time" for indexer runs.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn minutes_ago(minutes: i64) -> DateTime<Utc> {
    now() - Duration::minutes(minutes)
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            store: InMemoryDocumentStore::new(),
            storage: InMemoryDocumentStorage::new(),
            search: InMemorySearchIndex::new(),
            document_type: DocumentType {
                id: Uuid::new_v4(),
                name: "RFC".to_string(),
                long_name: "Request for Comments".to_string(),
                custom_fields: Vec::new(),
            },
            product: Product {
                id: Uuid::new_v4(),
                name: "Labs".to_string(),
                abbreviation: "LAB".to_string(),
            },
        }
    }

    fn document(&self, file_id: &str, status: DocumentStatus, number: i32) -> Document {
        Document {
            id: Uuid::new_v4(),
            google_file_id: file_id.to_string(),
            title: format!("Document {}", file_id),
            summary: None,
            status,
            document_number: number,
            product: self.product.clone(),
            document_type: self.document_type.clone(),
            custom_fields: Vec::new(),
            owner: Some(User {
                id: Uuid::new_v4(),
                email_address: "owner@x.io".to_string(),
            }),
            approvers: Vec::new(),
            contributors: Vec::new(),
            locked: false,
            shareable_as_draft: false,
            imported: false,
            document_created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            document_modified_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            file_revisions: Vec::new(),
        }
    }

    /// WIP draft present in the database, the drafts folder and the drafts collection.
    pub fn add_draft(&self, file_id: &str, modified: DateTime<Utc>) -> Document {
        let document = self.document(file_id, DocumentStatus::Wip, 0);
        self.seed(&document, DRAFTS_FOLDER, Collection::Drafts, modified);
        document
    }

    /// In-review document present in the database, the documents folder and `docs`.
    pub fn add_published(&self, file_id: &str, number: i32, modified: DateTime<Utc>) -> Document {
        let document = self.document(file_id, DocumentStatus::InReview, number);
        self.seed(&document, DOCS_FOLDER, Collection::Docs, modified);
        document
    }

    fn seed(
        &self,
        document: &Document,
        folder_id: &str,
        collection: Collection,
        modified: DateTime<Utc>,
    ) {
        self.store.add_document(document.clone());
        self.storage
            .add_document(&document.google_file_id, &document.title, folder_id, modified);
        self.search.insert(
            collection,
            SearchDocument::from_document(document, &[]).unwrap(),
        );
    }

    pub fn set_locked(&self, file_id: &str) {
        let mut document = self.store.document(file_id).unwrap();
        document.locked = true;
        self.store.add_document(document);
    }

    pub fn headers(&self) -> HeaderRenderer {
        HeaderRenderer::new(
            DocumentTypeRegistry::from_document_types(vec![self.document_type.clone()]),
            "https://docs.example.com",
        )
    }

    pub fn refresher(&self, max_parallel: usize) -> HeaderRefresher {
        HeaderRefresher::new(
            Arc::new(self.store.clone()),
            Arc::new(self.store.clone()),
            Arc::new(self.storage.clone()),
            Arc::new(self.search.clone()),
            self.headers(),
            max_parallel,
        )
    }

    pub fn config(&self, settings: IndexerSettings) -> IndexerConfig {
        IndexerConfig::new(
            &settings,
            &FolderConfig {
                documents_folder_id: DOCS_FOLDER.to_string(),
                drafts_folder_id: DRAFTS_FOLDER.to_string(),
                shortcuts_folder_id: "shortcuts-folder".to_string(),
            },
        )
    }

    pub fn indexer(&self, settings: IndexerSettings, cancel: CancellationToken) -> Indexer {
        Indexer::new(
            self.config(settings),
            Arc::new(self.store.clone()),
            Arc::new(self.store.clone()),
            Arc::new(self.storage.clone()),
            Arc::new(self.search.clone()),
            self.headers(),
            cancel,
        )
    }
}

/// Body whose header table carries a pending suggested deletion.
pub fn body_with_suggestion(file_id: &str) -> DocBody {
    serde_json::from_value(json!({
        "documentId": file_id,
        "body": {
            "content": [{
                "startIndex": 2,
                "endIndex": 20,
                "table": {
                    "rows": 1,
                    "columns": 1,
                    "tableRows": [{
                        "tableCells": [{
                            "content": [{
                                "paragraph": {
                                    "elements": [{
                                        "textRun": {
                                            "content": "[RFC] LAB-001",
                                            "suggestedDeletionIds": ["suggest.xyz"]
                                        }
                                    }]
                                }
                            }]
                        }]
                    }]
                }
            }]
        }
    }))
    .unwrap()
}
