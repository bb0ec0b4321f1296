//! Integration tests for stores persisted in a SQLite file.

use domain::{NoteType, RelationshipType};
use event_log::EventLogExt;
use store::{CreateBook, CreateNote, CreateRelationship, Store, StoreConfig, StoreError};
use tempfile::TempDir;

fn config(dir: &TempDir) -> StoreConfig {
    StoreConfig::default().with_db_path(dir.path().join("marginalia.db"))
}

#[tokio::test]
async fn test_reopened_store_replays_to_same_tables() {
    let dir = TempDir::new().unwrap();

    let store = Store::open_with_config(&config(&dir)).await.unwrap();
    let book = store
        .create_book(CreateBook::new("Dune").author("Frank Herbert"))
        .await
        .unwrap();
    let paul = store
        .create_note(CreateNote::new(book, NoteType::Character, "Paul", 1))
        .await
        .unwrap();
    let jessica = store
        .create_note(CreateNote::new(book, NoteType::Character, "Jessica", 1))
        .await
        .unwrap();
    store
        .create_relationship(CreateRelationship::new(
            paul,
            jessica,
            RelationshipType::Family,
            1,
        ))
        .await
        .unwrap();
    store.set_reading_progress(book, Some(42)).await.unwrap();
    store.delete_note(jessica).await.unwrap();

    let before = store.read(|t| t.clone()).await;
    store.close().await.unwrap();

    let reopened = Store::open(dir.path().join("marginalia.db")).await.unwrap();
    assert_eq!(reopened.read(|t| t.clone()).await, before);
    assert_eq!(reopened.log().event_count().await.unwrap(), 7);
    assert_eq!(reopened.get_book(book).await.unwrap().current_page, Some(42));
    assert_eq!(reopened.list_notes(book, None).await.unwrap().len(), 1);
    reopened.close().await.unwrap();
}

#[tokio::test]
async fn test_rejected_commit_is_not_persisted() {
    let dir = TempDir::new().unwrap();

    let store = Store::open_with_config(&config(&dir)).await.unwrap();
    let err = store.create_book(CreateBook::new("")).await.unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    store.close().await.unwrap();

    let reopened = Store::open_with_config(&config(&dir)).await.unwrap();
    assert!(reopened.log().is_empty().await.unwrap());
    assert!(reopened.list_books().await.is_empty());
}

#[tokio::test]
async fn test_closed_store_refuses_commits() {
    let dir = TempDir::new().unwrap();
    let store = Store::open_with_config(&config(&dir)).await.unwrap();
    store.close().await.unwrap();

    let err = store.create_book(CreateBook::new("Emma")).await.unwrap_err();
    assert!(matches!(err, StoreError::Closed));
}
