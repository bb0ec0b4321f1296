//! Cascade delete orchestration.
//!
//! Deleting a book soft-deletes its notes and every relationship touching
//! them; deleting a note soft-deletes its relationships. A cascade is planned
//! against one table snapshot and then committed one event at a time,
//! relationships first, then notes, then the root. Every event in a cascade
//! carries the same `deletedAt`.
//!
//! The log is append-only, so a cascade that fails part way is not rolled
//! back. The deletes that already committed stay, the root stays live, and
//! the caller receives a [`CascadeFailure`] naming both.

use chrono::{DateTime, Utc};
use common::{BookId, NoteId, RelationshipId};
use domain::{
    BookDeletedData, EntityRef, LibraryEvent, Note, NoteDeletedData, NoteRelationship,
    RelationshipDeletedData,
};
use projections::{Query, ReadTables};
use serde::Serialize;
use thiserror::Error;

use crate::error::{Result, StoreError};
use crate::service::{live_book, live_note, live_relationship};
use crate::store::Store;

/// The entities a delete will touch, in commit order.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadePlan {
    root: EntityRef,
    relationships: Vec<RelationshipId>,
    notes: Vec<NoteId>,
    deleted_at: DateTime<Utc>,
}

impl CascadePlan {
    pub fn root(&self) -> EntityRef {
        self.root
    }

    pub fn deleted_at(&self) -> DateTime<Utc> {
        self.deleted_at
    }

    /// Dependents first, root last.
    pub fn commit_order(&self) -> impl Iterator<Item = EntityRef> + '_ {
        self.relationships
            .iter()
            .map(|id| EntityRef::Relationship(*id))
            .chain(self.notes.iter().map(|id| EntityRef::Note(*id)))
            .chain(std::iter::once(self.root))
    }

    /// Number of events the cascade will commit, root included.
    pub fn steps(&self) -> usize {
        self.dependents() + 1
    }

    /// Number of dependents deleted before the root.
    pub fn dependents(&self) -> usize {
        self.relationships.len() + self.notes.len()
    }
}

/// Plans the deletion of a live book, its live notes, and the live
/// relationships touching any of them.
pub fn plan_book_deletion(
    tables: &ReadTables,
    book: BookId,
    deleted_at: DateTime<Utc>,
) -> Result<CascadePlan> {
    live_book(tables, book)?;
    let notes: Vec<NoteId> = Query::<Note>::new()
        .book(book)
        .run(tables)
        .into_iter()
        .map(|n| n.id)
        .collect();
    let relationships = Query::<NoteRelationship>::new()
        .touching_any(notes.iter().copied())
        .run(tables)
        .into_iter()
        .map(|r| r.id)
        .collect();

    Ok(CascadePlan {
        root: EntityRef::Book(book),
        relationships,
        notes,
        deleted_at,
    })
}

/// Plans the deletion of a live note and the live relationships touching it.
pub fn plan_note_deletion(
    tables: &ReadTables,
    note: NoteId,
    deleted_at: DateTime<Utc>,
) -> Result<CascadePlan> {
    live_note(tables, note)?;
    let relationships = Query::<NoteRelationship>::new()
        .touching(note)
        .run(tables)
        .into_iter()
        .map(|r| r.id)
        .collect();

    Ok(CascadePlan {
        root: EntityRef::Note(note),
        relationships,
        notes: Vec::new(),
        deleted_at,
    })
}

/// What a completed cascade deleted, in commit order. The root is last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub root: EntityRef,
    pub deleted: Vec<EntityRef>,
}

/// A cascade stopped before deleting its root.
#[derive(Debug, Error)]
#[error("cascade delete of {root} stopped at {failed} after {} deletes: {source}", .deleted.len())]
pub struct CascadeFailure {
    /// The entity the cascade was deleting.
    pub root: EntityRef,
    /// The entity whose delete failed.
    pub failed: EntityRef,
    /// Entities deleted before the failure. These stay deleted.
    pub deleted: Vec<EntityRef>,
    #[source]
    pub source: Box<StoreError>,
}

/// Commits a [`CascadePlan`] against a store.
pub struct CascadeDelete<'a> {
    store: &'a Store,
    plan: CascadePlan,
}

impl<'a> CascadeDelete<'a> {
    pub fn new(store: &'a Store, plan: CascadePlan) -> Self {
        Self { store, plan }
    }

    pub fn plan(&self) -> &CascadePlan {
        &self.plan
    }

    /// Commits one delete per planned entity, stopping at the first failure.
    #[tracing::instrument(skip(self), fields(root = %self.plan.root, dependents = self.plan.dependents()))]
    pub async fn execute(self) -> Result<CascadeReport> {
        let root = self.plan.root;
        let deleted_at = self.plan.deleted_at;
        let mut deleted = Vec::with_capacity(self.plan.steps());

        for entity in self.plan.commit_order() {
            if let Err(source) = self.store.commit(deletion(entity, deleted_at)).await {
                tracing::warn!(
                    %root,
                    failed = %entity,
                    deleted = deleted.len(),
                    error = %source,
                    "cascade delete aborted"
                );
                metrics::counter!("cascade_deletes_total", "outcome" => "aborted").increment(1);
                return Err(CascadeFailure {
                    root,
                    failed: entity,
                    deleted,
                    source: Box::new(source),
                }
                .into());
            }
            deleted.push(entity);
        }

        metrics::counter!("cascade_deletes_total", "outcome" => "completed").increment(1);
        tracing::info!(%root, deleted = deleted.len(), "cascade delete completed");

        Ok(CascadeReport { root, deleted })
    }
}

fn deletion(entity: EntityRef, deleted_at: DateTime<Utc>) -> LibraryEvent {
    match entity {
        EntityRef::Book(id) => LibraryEvent::BookDeleted(BookDeletedData { id, deleted_at }),
        EntityRef::Note(id) => LibraryEvent::NoteDeleted(NoteDeletedData { id, deleted_at }),
        EntityRef::Relationship(id) => {
            LibraryEvent::RelationshipDeleted(RelationshipDeletedData { id, deleted_at })
        }
    }
}

impl Store {
    /// Soft-deletes a book with its notes and their relationships.
    pub async fn delete_book(&self, book: BookId) -> Result<CascadeReport> {
        let deleted_at = Utc::now();
        let plan = self
            .read(|tables| plan_book_deletion(tables, book, deleted_at))
            .await?;
        CascadeDelete::new(self, plan).execute().await
    }

    /// Soft-deletes a note with its relationships.
    pub async fn delete_note(&self, note: NoteId) -> Result<CascadeReport> {
        let deleted_at = Utc::now();
        let plan = self
            .read(|tables| plan_note_deletion(tables, note, deleted_at))
            .await?;
        CascadeDelete::new(self, plan).execute().await
    }

    /// Soft-deletes a single relationship.
    #[tracing::instrument(skip(self))]
    pub async fn delete_relationship(&self, relationship: RelationshipId) -> Result<()> {
        self.read(|tables| live_relationship(tables, relationship))
            .await?;
        self.commit(deletion(EntityRef::Relationship(relationship), Utc::now()))
            .await?;
        Ok(())
    }
}
