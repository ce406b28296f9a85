//! Shared fixtures for lifecycle integration tests.
//!
//! Every test gets fresh in-memory providers seeded with one WIP RFC draft,
//! `file-1`, in the drafts folder.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use docflow_core::models::{
    CustomFieldType, Document, DocumentCustomField, DocumentStatus, DocumentType,
    DocumentTypeCustomField, Product, User,
};
use docflow_core::{Collection, DocumentTypeRegistry, FolderConfig, SearchDocument};
use docflow_db::test_helpers::InMemoryDocumentStore;
use docflow_services::{LifecycleContext, ReviewService, TracingNotifier};
use docflow_storage::body::DocBody;
use docflow_storage::test_helpers::{InMemoryDocumentStorage, InMemorySearchIndex};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

pub const FILE_ID: &str = "file-1";
pub const DRAFTS_FOLDER: &str = "drafts-folder";
pub const DOCS_FOLDER: &str = "docs-folder";
pub const SHORTCUTS_FOLDER: &str = "shortcuts-folder";

pub struct TestEnv {
    pub store: InMemoryDocumentStore,
    pub storage: InMemoryDocumentStorage,
    pub search: InMemorySearchIndex,
    pub ctx: LifecycleContext,
    pub service: ReviewService,
    pub document: Document,
}

pub fn modified_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

fn user(email: &str) -> User {
    User {
        id: Uuid::new_v4(),
        email_address: email.to_string(),
    }
}

pub fn rfc_type() -> DocumentType {
    DocumentType {
        id: Uuid::new_v4(),
        name: "RFC".to_string(),
        long_name: "Request for Comments".to_string(),
        custom_fields: vec![DocumentTypeCustomField {
            id: Uuid::new_v4(),
            name: "Current Version".to_string(),
            field_type: CustomFieldType::String,
            read_only: false,
        }],
    }
}

pub fn draft_document() -> Document {
    let document_type = rfc_type();
    Document {
        id: Uuid::new_v4(),
        google_file_id: FILE_ID.to_string(),
        title: "Better widgets".to_string(),
        summary: Some("Widgets, but better".to_string()),
        status: DocumentStatus::Wip,
        document_number: 0,
        product: Product {
            id: Uuid::new_v4(),
            name: "Labs".to_string(),
            abbreviation: "LAB".to_string(),
        },
        custom_fields: vec![DocumentCustomField {
            field: document_type.custom_fields[0].clone(),
            value: "1.2".to_string(),
        }],
        document_type,
        owner: Some(user("owner@x.io")),
        approvers: vec![user("a@x.io"), user("b@x.io")],
        contributors: vec![user("c@x.io")],
        locked: false,
        shareable_as_draft: false,
        imported: false,
        document_created_at: Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap(),
        document_modified_at: modified_at(),
        file_revisions: Vec::new(),
    }
}

pub fn setup() -> TestEnv {
    let store = InMemoryDocumentStore::new();
    let storage = InMemoryDocumentStorage::new();
    let search = InMemorySearchIndex::new();

    let document = draft_document();
    store.add_document(document.clone());
    storage.add_document(FILE_ID, &document.title, DRAFTS_FOLDER, modified_at());
    search.insert(
        Collection::Drafts,
        SearchDocument::from_document(&document, &[]).unwrap(),
    );

    let ctx = LifecycleContext {
        store: Arc::new(store.clone()),
        storage: Arc::new(storage.clone()),
        search: Arc::new(search.clone()),
        registry: DocumentTypeRegistry::from_document_types(vec![document
            .document_type
            .clone()]),
        base_url: "https://docs.example.com".to_string(),
        folders: FolderConfig {
            documents_folder_id: DOCS_FOLDER.to_string(),
            drafts_folder_id: DRAFTS_FOLDER.to_string(),
            shortcuts_folder_id: SHORTCUTS_FOLDER.to_string(),
        },
    };
    let service = ReviewService::new(ctx.clone(), Arc::new(TracingNotifier));

    TestEnv {
        store,
        storage,
        search,
        ctx,
        service,
        document,
    }
}

/// Body whose header table carries a pending suggested insertion.
pub fn body_with_suggestion() -> DocBody {
    serde_json::from_value(json!({
        "documentId": FILE_ID,
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
                                            "content": "[RFC] LAB-???",
                                            "suggestedInsertionIds": ["suggest.abc"]
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
