//! Record persistence and the post-commit cleanup contract.

mod common;

use common::{MemoryStorage, avatar_field, test_records};
use serde_json::json;
use staged_uploads::finalize::Finalizer;
use staged_uploads::models::{Record, UploadRequest};
use staged_uploads::services::record_service::RecordError;
use staged_uploads::storage::{CLOUD_DISK, StorageRegistry};
use std::sync::Arc;
use uuid::Uuid;

fn finalizer(storage: Arc<MemoryStorage>) -> Finalizer {
    Finalizer::new(StorageRegistry::new().with_disk(CLOUD_DISK, storage))
}

fn replacement() -> UploadRequest {
    UploadRequest::new()
        .with_input("avatar.uuid", "u2")
        .with_input("avatarkey", "tmp/new.png")
        .with_input("avatars3Key", "tmp/new.png")
        .with_input("avatar.originalName", "new.png")
}

#[tokio::test]
async fn create_and_fetch_round_trips_attributes() {
    let records = test_records().await;
    let mut record = records.create("users").await.unwrap();
    record.set("email", "a@example.com");
    records.save(&mut record, Vec::new()).await.unwrap();

    let fetched = records.fetch("users", record.id).await.unwrap();
    assert_eq!(fetched.get_str("email"), Some("a@example.com"));
    assert_eq!(fetched.id, record.id);
}

#[tokio::test]
async fn fetch_is_scoped_to_resource() {
    let records = test_records().await;
    let record = records.create("users").await.unwrap();

    let err = records.fetch("posts", record.id).await.unwrap_err();
    assert!(matches!(err, RecordError::NotFound { .. }));

    let err = records.fetch("users", Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, RecordError::NotFound { .. }));
}

#[tokio::test]
async fn save_runs_cleanup_after_commit() {
    let storage = Arc::new(
        MemoryStorage::new()
            .with_object("uploads/old.png", b"old")
            .with_object("tmp/new.png", b"new"),
    );
    let records = test_records().await;
    let mut record = records.create("users").await.unwrap();
    record.set("avatar", "uploads/old.png");
    records.save(&mut record, Vec::new()).await.unwrap();

    let cleanup = finalizer(storage.clone())
        .finalize(&replacement(), &mut record, &avatar_field())
        .await
        .unwrap()
        .into_cleanup()
        .unwrap();

    let completed = records.save(&mut record, vec![cleanup]).await.unwrap();
    assert_eq!(completed, 1);
    assert!(!storage.contains("uploads/old.png"));
    assert!(storage.contains("uploads/new.png"));

    let stored = records.fetch("users", record.id).await.unwrap();
    assert_eq!(stored.get_str("avatar"), Some("uploads/new.png"));
    assert_eq!(stored.get_str("avatar_name"), Some("new.png"));
    assert_eq!(stored.get("avatar_size"), Some(&json!(3)));
}

#[tokio::test]
async fn failed_save_keeps_the_previous_file() {
    let storage = Arc::new(
        MemoryStorage::new()
            .with_object("uploads/old.png", b"old")
            .with_object("tmp/new.png", b"new"),
    );
    let records = test_records().await;

    // Never inserted, so the UPDATE matches nothing.
    let mut record = Record::new("users");
    record.set("avatar", "uploads/old.png");

    let cleanup = finalizer(storage.clone())
        .finalize(&replacement(), &mut record, &avatar_field())
        .await
        .unwrap()
        .into_cleanup()
        .unwrap();

    let err = records.save(&mut record, vec![cleanup]).await.unwrap_err();
    assert!(matches!(err, RecordError::NotFound { .. }));
    assert!(storage.contains("uploads/old.png"));
    assert!(!storage.calls().iter().any(|call| call.starts_with("delete:")));
}

#[tokio::test]
async fn delete_removes_record_then_file() {
    let storage = Arc::new(MemoryStorage::new().with_object("uploads/a.png", b"a"));
    let records = test_records().await;
    let mut record = records.create("users").await.unwrap();
    record.set("avatar", "uploads/a.png");
    records.save(&mut record, Vec::new()).await.unwrap();

    let removal = finalizer(storage.clone())
        .schedule_removal(&UploadRequest::new(), &record, &avatar_field())
        .unwrap();
    let completed = records.delete(&record, vec![removal]).await.unwrap();

    assert_eq!(completed, 1);
    assert!(!storage.contains("uploads/a.png"));
    let err = records.fetch("users", record.id).await.unwrap_err();
    assert!(matches!(err, RecordError::NotFound { .. }));
}

#[tokio::test]
async fn deleting_a_missing_record_keeps_the_file() {
    let storage = Arc::new(MemoryStorage::new().with_object("uploads/a.png", b"a"));
    let records = test_records().await;
    let mut record = Record::new("users");
    record.set("avatar", "uploads/a.png");

    let removal = finalizer(storage.clone())
        .schedule_removal(&UploadRequest::new(), &record, &avatar_field())
        .unwrap();
    let err = records.delete(&record, vec![removal]).await.unwrap_err();

    assert!(matches!(err, RecordError::NotFound { .. }));
    assert!(storage.contains("uploads/a.png"));
}
