//! Approve / request-changes and lock detection integration tests.
//!
//! Run with: `cargo test -p docflow-services --test review_test`

mod helpers;

use chrono::Duration;
use docflow_core::models::ReviewStatus;
use docflow_core::{AppError, Collection};
use docflow_services::LockDetector;
use docflow_storage::body::DocBody;
use helpers::{modified_at, setup, TestEnv, FILE_ID};
use std::sync::Arc;

async fn published() -> TestEnv {
    let env = setup();
    env.service.publish(FILE_ID).await.unwrap();
    env
}

#[tokio::test]
async fn test_approve_records_review_and_pins_revision() {
    let env = published().await;
    env.storage
        .add_revision(FILE_ID, "file-1-rev-2", modified_at() + Duration::minutes(5));

    let outcome = env.service.approve(FILE_ID, "a@x.io").await.unwrap();

    assert_eq!(outcome.document.approved_by, vec!["a@x.io"]);
    assert_eq!(outcome.consistency.map(|r| r.is_empty()), Some(true));

    let reviews = env.store.reviews(env.document.id);
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].user_email, "a@x.io");
    assert_eq!(reviews[0].status, ReviewStatus::Approved);

    assert!(
        env.storage
            .revision(FILE_ID, "file-1-rev-2")
            .unwrap()
            .keep_forever
    );
    let document = env.store.document(FILE_ID).unwrap();
    assert!(document
        .file_revisions
        .iter()
        .any(|r| r.google_drive_file_revision_id == "file-1-rev-2"
            && r.name == "Approved by a@x.io"));

    let saved = env.search.object(Collection::Docs, FILE_ID).unwrap();
    assert_eq!(saved.approved_by, vec!["a@x.io"]);
    assert_eq!(
        saved.file_revisions.get("file-1-rev-2").map(String::as_str),
        Some("Approved by a@x.io")
    );
}

#[tokio::test]
async fn test_request_changes_replaces_approval() {
    let env = published().await;
    env.service.approve(FILE_ID, "b@x.io").await.unwrap();
    env.storage
        .add_revision(FILE_ID, "file-1-rev-2", modified_at() + Duration::minutes(5));

    let outcome = env
        .service
        .request_changes(FILE_ID, "b@x.io")
        .await
        .unwrap();

    assert!(outcome.document.approved_by.is_empty());
    assert_eq!(outcome.document.changes_requested_by, vec!["b@x.io"]);
    let reviews = env.store.reviews(env.document.id);
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].status, ReviewStatus::ChangesRequested);
    assert_eq!(outcome.consistency.map(|r| r.is_empty()), Some(true));
}

#[tokio::test]
async fn test_invalid_reviews_have_no_side_effects() {
    let env = published().await;
    env.service.approve(FILE_ID, "a@x.io").await.unwrap();
    let writes_before = env.store.writes();
    let edits_before = env.storage.edits(FILE_ID).len();

    for result in [
        env.service.approve(FILE_ID, "a@x.io").await,
        env.service.approve(FILE_ID, "mallory@x.io").await,
    ] {
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    assert_eq!(env.store.writes(), writes_before);
    assert_eq!(env.storage.edits(FILE_ID).len(), edits_before);
}

#[tokio::test]
async fn test_drafts_cannot_be_reviewed() {
    let env = setup();
    let err = env.service.approve(FILE_ID, "a@x.io").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "{:?}", err);
    assert!(env.store.reviews(env.document.id).is_empty());
}

#[tokio::test]
async fn test_lock_detection_writes_only_on_change() {
    let env = setup();
    let detector = LockDetector::new(Arc::new(env.store.clone()), Arc::new(env.storage.clone()));

    env.storage
        .set_body(FILE_ID, helpers::body_with_suggestion());
    assert!(detector.is_locked(FILE_ID).await.unwrap());
    assert!(detector.is_locked(FILE_ID).await.unwrap());
    assert_eq!(env.store.writes(), vec!["set_locked".to_string()]);

    env.storage.set_body(FILE_ID, DocBody::default());
    assert!(!detector.is_locked(FILE_ID).await.unwrap());
    assert!(!detector.is_locked(FILE_ID).await.unwrap());
    assert_eq!(
        env.store.writes(),
        vec!["set_locked".to_string(), "set_locked".to_string()]
    );
    assert!(!env.store.document(FILE_ID).unwrap().locked);
}

#[tokio::test]
async fn test_lock_detection_requires_known_document() {
    let env = setup();
    let detector = LockDetector::new(Arc::new(env.store.clone()), Arc::new(env.storage.clone()));
    let err = detector.is_locked("unknown").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
