//! Repository tests against a real Postgres.
//!
//! Run with: `cargo test -p docflow-db --test repository_test`

mod helpers;

use chrono::{TimeZone, Utc};
use docflow_core::models::{
    DocumentStatus, FolderKind, NewFileRevision, PublicationRecord, ReviewStatus,
};
use docflow_core::AppError;
use docflow_db::{
    DocumentRepository, DocumentStore, IndexerRepository, PgDocumentStore,
    ProductNumberRepository, ReviewRepository, WatermarkStore,
};
use helpers::{insert_catalog, insert_document, insert_document_type, setup_test_db};

fn publication(document_number: i32) -> PublicationRecord {
    PublicationRecord {
        document_number,
        document_created_at: Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
        document_modified_at: Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap(),
        revision: NewFileRevision::new("rev-1", "Requested review"),
    }
}

#[tokio::test]
async fn test_concurrent_allocations_are_unique_and_gapless() {
    let db = setup_test_db().await;
    let catalog = insert_catalog(&db.pool).await;
    let numbers = ProductNumberRepository::new(db.pool.clone());

    let allocations = (0..25).map(|_| {
        let numbers = numbers.clone();
        let product_id = catalog.product_id;
        let document_type_id = catalog.document_type_id;
        tokio::spawn(async move {
            numbers
                .next_document_number(product_id, document_type_id)
                .await
        })
    });

    let mut allocated: Vec<i32> = futures::future::join_all(allocations)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();
    allocated.sort_unstable();

    assert_eq!(allocated, (1..=25).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_counters_are_per_product_and_type() {
    let db = setup_test_db().await;
    let catalog = insert_catalog(&db.pool).await;
    let prd = insert_document_type(&db.pool, "PRD").await;
    let numbers = ProductNumberRepository::new(db.pool.clone());

    for expected in 1..=3 {
        let next = numbers
            .next_document_number(catalog.product_id, catalog.document_type_id)
            .await
            .unwrap();
        assert_eq!(next, expected);
    }
    assert_eq!(
        numbers
            .next_document_number(catalog.product_id, prd)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_record_publication_moves_draft_into_review() {
    let db = setup_test_db().await;
    let catalog = insert_catalog(&db.pool).await;
    insert_document(&db.pool, &catalog, "draft-1", DocumentStatus::Wip, false).await;
    let store = PgDocumentStore::new(db.pool.clone());

    store
        .record_publication("draft-1", &publication(4))
        .await
        .unwrap();

    let document = store.get_document("draft-1").await.unwrap().unwrap();
    assert_eq!(document.status, DocumentStatus::InReview);
    assert_eq!(document.document_number, 4);
    assert_eq!(document.product.abbreviation, "LAB");
    assert_eq!(document.document_type.name, "RFC");
    assert_eq!(
        document.document_modified_at,
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
    );
    assert_eq!(document.file_revisions.len(), 1);
    assert_eq!(document.file_revisions[0].name, "Requested review");
}

#[tokio::test]
async fn test_record_publication_rejects_non_draft() {
    let db = setup_test_db().await;
    let catalog = insert_catalog(&db.pool).await;
    insert_document(&db.pool, &catalog, "doc-1", DocumentStatus::InReview, false).await;
    let documents = DocumentRepository::new(db.pool.clone());

    let err = documents
        .record_publication("doc-1", &publication(9))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "{:?}", err);

    let document = documents
        .get_by_google_file_id("doc-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(document.document_number, 0);
    assert!(document.file_revisions.is_empty());
}

#[tokio::test]
async fn test_record_publication_only_applies_once() {
    let db = setup_test_db().await;
    let catalog = insert_catalog(&db.pool).await;
    insert_document(&db.pool, &catalog, "draft-1", DocumentStatus::Wip, false).await;
    let documents = DocumentRepository::new(db.pool.clone());

    documents
        .record_publication("draft-1", &publication(1))
        .await
        .unwrap();
    assert!(documents
        .record_publication("draft-1", &publication(2))
        .await
        .is_err());

    let document = documents
        .get_by_google_file_id("draft-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(document.document_number, 1);
    assert_eq!(document.file_revisions.len(), 1);
}

#[tokio::test]
async fn test_review_upsert_replaces_earlier_verdict() {
    let db = setup_test_db().await;
    let catalog = insert_catalog(&db.pool).await;
    let document_id =
        insert_document(&db.pool, &catalog, "doc-1", DocumentStatus::InReview, false).await;
    let reviews = ReviewRepository::new(db.pool.clone());

    reviews
        .upsert(document_id, "a@x.io", ReviewStatus::Approved)
        .await
        .unwrap();
    let replaced = reviews
        .upsert(document_id, "a@x.io", ReviewStatus::ChangesRequested)
        .await
        .unwrap();
    assert_eq!(replaced.user_email, "a@x.io");
    assert!(matches!(replaced.status, ReviewStatus::ChangesRequested));

    reviews
        .upsert(document_id, "b@x.io", ReviewStatus::Approved)
        .await
        .unwrap();

    let stored = reviews.list_for_document(document_id).await.unwrap();
    assert_eq!(stored.len(), 2);
    let a = stored.iter().find(|r| r.user_email == "a@x.io").unwrap();
    assert!(matches!(a.status, ReviewStatus::ChangesRequested));
    let b = stored.iter().find(|r| r.user_email == "b@x.io").unwrap();
    assert!(matches!(b.status, ReviewStatus::Approved));
}

#[tokio::test]
async fn test_find_locked_matches_folder_kind() {
    let db = setup_test_db().await;
    let catalog = insert_catalog(&db.pool).await;
    let pool = &db.pool;
    insert_document(pool, &catalog, "draft-locked", DocumentStatus::Wip, true).await;
    insert_document(pool, &catalog, "draft-free", DocumentStatus::Wip, false).await;
    insert_document(pool, &catalog, "review-locked", DocumentStatus::InReview, true).await;
    insert_document(pool, &catalog, "approved-locked", DocumentStatus::Approved, true).await;
    insert_document(pool, &catalog, "obsolete-free", DocumentStatus::Obsolete, false).await;
    let store = PgDocumentStore::new(db.pool.clone());

    assert_eq!(
        store.find_locked(FolderKind::Drafts).await.unwrap(),
        vec!["draft-locked".to_string()]
    );
    assert_eq!(
        store.find_locked(FolderKind::Documents).await.unwrap(),
        vec!["approved-locked".to_string(), "review-locked".to_string()]
    );

    store.set_locked("draft-locked", false).await.unwrap();
    assert!(store.find_locked(FolderKind::Drafts).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_set_locked_on_unknown_document_is_not_found() {
    let db = setup_test_db().await;
    let store = PgDocumentStore::new(db.pool.clone());

    let err = store.set_locked("missing", true).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "{:?}", err);
}

#[tokio::test]
async fn test_watermarks_are_upserted_by_key() {
    let db = setup_test_db().await;
    let indexer = IndexerRepository::new(db.pool.clone());
    let store: &dyn WatermarkStore = &indexer;
    let earlier = Utc.with_ymd_and_hms(2024, 6, 1, 11, 0, 0).unwrap();
    let later = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

    assert_eq!(store.folder_watermark("docs-folder").await.unwrap(), None);
    assert_eq!(store.last_full_index().await.unwrap(), None);

    store.set_folder_watermark("docs-folder", earlier).await.unwrap();
    store.set_folder_watermark("docs-folder", later).await.unwrap();
    store
        .set_folder_watermark("refreshHeaders:drafts-folder", earlier)
        .await
        .unwrap();
    store.set_last_full_index(earlier).await.unwrap();
    store.set_last_full_index(later).await.unwrap();

    assert_eq!(
        store.folder_watermark("docs-folder").await.unwrap(),
        Some(later)
    );
    assert_eq!(store.last_full_index().await.unwrap(), Some(later));

    let folders = store.list_folders().await.unwrap();
    let keys: Vec<&str> = folders.iter().map(|f| f.google_drive_id.as_str()).collect();
    assert_eq!(keys, vec!["docs-folder", "refreshHeaders:drafts-folder"]);
}
