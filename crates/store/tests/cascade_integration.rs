//! Integration tests for cascade deletes, including a log that starts
//! refusing appends part way through a cascade.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use common::{BookId, EventId, NoteId, RelationshipId};
use domain::{Book, EntityRef, Note, NoteRelationship, NoteType, RelationshipType};
use event_log::{
    EventEnvelope, EventLog, EventLogError, EventLogExt, EventQuery, EventStream,
    InMemoryEventLog, Sequence,
};
use projections::Query;
use store::{CreateBook, CreateNote, CreateRelationship, Store, StoreError};

/// An in-memory log that accepts a limited number of further appends.
struct FlakyLog {
    inner: InMemoryEventLog,
    remaining: AtomicUsize,
}

impl FlakyLog {
    fn new() -> Self {
        Self {
            inner: InMemoryEventLog::new(),
            remaining: AtomicUsize::new(usize::MAX),
        }
    }

    fn allow(&self, appends: usize) {
        self.remaining.store(appends, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventLog for FlakyLog {
    async fn append(&self, event: EventEnvelope) -> event_log::Result<Sequence> {
        let allowed = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !allowed {
            return Err(EventLogError::Closed);
        }
        self.inner.append(event).await
    }

    async fn replay_all(&self) -> event_log::Result<Vec<EventEnvelope>> {
        self.inner.replay_all().await
    }

    async fn stream_all(&self) -> event_log::Result<EventStream> {
        self.inner.stream_all().await
    }

    async fn query_events(&self, query: EventQuery) -> event_log::Result<Vec<EventEnvelope>> {
        self.inner.query_events(query).await
    }

    async fn get_event(&self, event_id: EventId) -> event_log::Result<Option<EventEnvelope>> {
        self.inner.get_event(event_id).await
    }

    async fn last_sequence(&self) -> event_log::Result<Sequence> {
        self.inner.last_sequence().await
    }
}

struct Library {
    store: Store,
    log: Arc<FlakyLog>,
    book: BookId,
    n1: NoteId,
    n2: NoteId,
    rel: RelationshipId,
}

async fn library() -> Library {
    let log = Arc::new(FlakyLog::new());
    let store = Store::with_log(log.clone()).await.unwrap();

    let book = store.create_book(CreateBook::new("Beloved")).await.unwrap();
    let n1 = store
        .create_note(CreateNote::new(book, NoteType::Character, "Sethe", 1))
        .await
        .unwrap();
    let n2 = store
        .create_note(CreateNote::new(book, NoteType::Character, "Denver", 2))
        .await
        .unwrap();
    let rel = store
        .create_relationship(CreateRelationship::new(n1, n2, RelationshipType::Family, 2))
        .await
        .unwrap();

    Library {
        store,
        log,
        book,
        n1,
        n2,
        rel,
    }
}

#[tokio::test]
async fn test_book_delete_reaches_every_dependent() {
    let l = library().await;

    let report = l.store.delete_book(l.book).await.unwrap();

    assert_eq!(
        report.deleted,
        vec![
            EntityRef::Relationship(l.rel),
            EntityRef::Note(l.n1),
            EntityRef::Note(l.n2),
            EntityRef::Book(l.book),
        ]
    );

    let (book, notes, rels) = l
        .store
        .read(|t| {
            (
                t.books().get(l.book).cloned(),
                Query::<Note>::new().include_deleted().run(t),
                Query::<NoteRelationship>::new().include_deleted().run(t),
            )
        })
        .await;
    assert!(book.unwrap().deleted_at.is_some());
    assert!(notes.iter().all(|n| n.deleted_at.is_some()));
    assert!(rels.iter().all(|r| r.deleted_at.is_some()));
    assert!(l.store.list_books().await.is_empty());
    assert_eq!(
        l.store.log().get_events_by_type("v1.NoteDeleted").await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn test_note_delete_cascades_to_relationships_only() {
    let l = library().await;

    let report = l.store.delete_note(l.n2).await.unwrap();

    assert_eq!(
        report.deleted,
        vec![EntityRef::Relationship(l.rel), EntityRef::Note(l.n2)]
    );
    assert!(l.store.get_note(l.book, l.n1).await.is_ok());
    assert!(l.store.get_book(l.book).await.is_ok());
    assert!(l.store.relationships_for_note(l.n1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_cascade_reports_partial_progress_and_keeps_root() {
    let l = library().await;
    // Relationship and first note go through; the second note does not.
    l.log.allow(2);

    let err = l.store.delete_book(l.book).await.unwrap_err();

    let StoreError::Cascade(failure) = err else {
        panic!("expected cascade failure, got {err:?}");
    };
    assert_eq!(failure.root, EntityRef::Book(l.book));
    assert_eq!(failure.failed, EntityRef::Note(l.n2));
    assert_eq!(
        failure.deleted,
        vec![EntityRef::Relationship(l.rel), EntityRef::Note(l.n1)]
    );
    assert!(matches!(*failure.source, StoreError::EventLog(EventLogError::Closed)));

    // Committed deletes stay; the root and the failed entity stay live.
    assert!(l.store.get_book(l.book).await.is_ok());
    assert!(l.store.get_note(l.book, l.n2).await.is_ok());
    assert!(l.store.get_note(l.book, l.n1).await.is_err());
    assert_eq!(l.log.event_count().await.unwrap(), 6);

    // Once the log recovers, retrying finishes the job.
    l.log.allow(usize::MAX);
    let report = l.store.delete_book(l.book).await.unwrap();
    assert_eq!(
        report.deleted,
        vec![EntityRef::Note(l.n2), EntityRef::Book(l.book)]
    );
    assert!(l.store.first(Query::<Book>::by_id(l.book)).await.is_none());
}

#[tokio::test]
async fn test_failed_root_delete_is_reported() {
    let l = library().await;
    l.log.allow(1);

    let err = l.store.delete_note(l.n1).await.unwrap_err();

    let StoreError::Cascade(failure) = err else {
        panic!("expected cascade failure, got {err:?}");
    };
    assert_eq!(failure.failed, EntityRef::Note(l.n1));
    assert_eq!(failure.deleted, vec![EntityRef::Relationship(l.rel)]);
    assert!(failure.to_string().contains("after 1 deletes"));
}
