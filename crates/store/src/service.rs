//! Service operations: referential checks before commit, and lookups.
//!
//! The commit path only checks that an event is well formed and applies to
//! the tables. Whether a note's book exists, or whether two notes may be
//! related, is checked here first, against a consistent snapshot.

use common::{BookId, NoteId, RelationshipId};
use domain::{
    Book, BookCreatedData, BookProgressUpdatedData, BookUpdatedData, EntityRef, LibraryEvent,
    Note, NoteCreatedData, NoteRelationship, NoteType, NoteUpdatedData, RelationshipCreatedData,
    RelationshipUpdatedData,
};
use projections::{Query, ReadTables};
use serde::Serialize;

use crate::commands::{
    CreateBook, CreateNote, CreateRelationship, UpdateBook, UpdateNote, UpdateRelationship,
};
use crate::error::{InvalidRelationship, Result, StoreError};
use crate::store::Store;

/// A note with the relationships that touch it and the note at the other end.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteDetail {
    pub note: Note,
    /// Relationships starting at this note, paired with their target.
    pub outgoing: Vec<(NoteRelationship, Note)>,
    /// Relationships ending at this note, paired with their source.
    pub incoming: Vec<(NoteRelationship, Note)>,
}

pub(crate) fn live_book(tables: &ReadTables, id: BookId) -> Result<Book> {
    Query::<Book>::by_id(id)
        .first(tables)
        .ok_or(StoreError::NotFound(EntityRef::Book(id)))
}

pub(crate) fn live_note(tables: &ReadTables, id: NoteId) -> Result<Note> {
    Query::<Note>::by_id(id)
        .first(tables)
        .ok_or(StoreError::NotFound(EntityRef::Note(id)))
}

pub(crate) fn live_relationship(tables: &ReadTables, id: RelationshipId) -> Result<NoteRelationship> {
    Query::<NoteRelationship>::by_id(id)
        .first(tables)
        .ok_or(StoreError::NotFound(EntityRef::Relationship(id)))
}

fn note_in_book(tables: &ReadTables, book: BookId, note: NoteId) -> Result<Note> {
    live_note(tables, note)
        .ok()
        .filter(|n| n.book_id == book)
        .ok_or(StoreError::NotFound(EntityRef::Note(note)))
}

/// Checks that `from` and `to` may be related: distinct, live, same book.
fn check_endpoints(tables: &ReadTables, from: NoteId, to: NoteId) -> Result<()> {
    if from == to {
        return Err(InvalidRelationship::SelfReference(from).into());
    }
    let from_note = live_note(tables, from)?;
    let to_note = live_note(tables, to)?;
    if from_note.book_id != to_note.book_id {
        return Err(InvalidRelationship::CrossBook { from, to }.into());
    }
    Ok(())
}

impl Store {
    /// Adds a book.
    #[tracing::instrument(skip(self, cmd), fields(book_id = %cmd.id))]
    pub async fn create_book(&self, cmd: CreateBook) -> Result<BookId> {
        let id = cmd.id;
        self.commit(LibraryEvent::BookCreated(BookCreatedData {
            id,
            title: cmd.title,
            author: cmd.author,
            created_at: cmd.created_at,
        }))
        .await?;
        Ok(id)
    }

    /// Patches a live book.
    #[tracing::instrument(skip(self, cmd), fields(book_id = %cmd.id))]
    pub async fn update_book(&self, cmd: UpdateBook) -> Result<()> {
        self.read(|tables| live_book(tables, cmd.id)).await?;
        self.commit(LibraryEvent::BookUpdated(BookUpdatedData {
            id: cmd.id,
            title: cmd.title,
            author: cmd.author,
        }))
        .await?;
        Ok(())
    }

    /// Records the reader's current page for a book; `None` clears it.
    #[tracing::instrument(skip(self))]
    pub async fn set_reading_progress(&self, book: BookId, current_page: Option<u32>) -> Result<()> {
        self.read(|tables| live_book(tables, book)).await?;
        self.commit(LibraryEvent::BookProgressUpdated(BookProgressUpdatedData {
            id: book,
            current_page,
        }))
        .await?;
        Ok(())
    }

    /// Attaches a note to a live book.
    #[tracing::instrument(skip(self, cmd), fields(note_id = %cmd.id, book_id = %cmd.book_id))]
    pub async fn create_note(&self, cmd: CreateNote) -> Result<NoteId> {
        self.read(|tables| live_book(tables, cmd.book_id)).await?;
        let id = cmd.id;
        self.commit(LibraryEvent::NoteCreated(NoteCreatedData {
            id,
            book_id: cmd.book_id,
            note_type: cmd.note_type,
            title: cmd.title,
            content: cmd.content,
            page_number: cmd.page_number,
            metadata: cmd.metadata,
            created_at: cmd.created_at,
            updated_at: cmd.created_at,
        }))
        .await?;
        Ok(id)
    }

    /// Patches a live note.
    #[tracing::instrument(skip(self, cmd), fields(note_id = %cmd.id))]
    pub async fn update_note(&self, cmd: UpdateNote) -> Result<()> {
        self.read(|tables| live_note(tables, cmd.id)).await?;
        self.commit(LibraryEvent::NoteUpdated(NoteUpdatedData {
            id: cmd.id,
            note_type: cmd.note_type,
            title: cmd.title,
            content: cmd.content,
            page_number: cmd.page_number,
            metadata: cmd.metadata,
            updated_at: cmd.updated_at,
        }))
        .await?;
        Ok(())
    }

    /// Relates two live notes of the same book.
    #[tracing::instrument(skip(self, cmd), fields(relationship_id = %cmd.id))]
    pub async fn create_relationship(&self, cmd: CreateRelationship) -> Result<RelationshipId> {
        self.read(|tables| check_endpoints(tables, cmd.from_note_id, cmd.to_note_id))
            .await?;
        let id = cmd.id;
        self.commit(LibraryEvent::RelationshipCreated(RelationshipCreatedData {
            id,
            from_note_id: cmd.from_note_id,
            to_note_id: cmd.to_note_id,
            relationship_type: cmd.relationship_type,
            description: cmd.description,
            page_number: cmd.page_number,
            created_at: cmd.created_at,
        }))
        .await?;
        Ok(id)
    }

    /// Patches a live relationship.
    #[tracing::instrument(skip(self, cmd), fields(relationship_id = %cmd.id))]
    pub async fn update_relationship(&self, cmd: UpdateRelationship) -> Result<()> {
        self.read(|tables| live_relationship(tables, cmd.id)).await?;
        self.commit(LibraryEvent::RelationshipUpdated(RelationshipUpdatedData {
            id: cmd.id,
            relationship_type: cmd.relationship_type,
            description: cmd.description,
            page_number: cmd.page_number,
        }))
        .await?;
        Ok(())
    }

    /// Returns a live book.
    pub async fn get_book(&self, id: BookId) -> Result<Book> {
        self.read(|tables| live_book(tables, id)).await
    }

    /// Returns every live book, in creation order.
    pub async fn list_books(&self) -> Vec<Book> {
        self.query(Query::<Book>::new()).await
    }

    /// Returns the live notes of a live book, optionally of one type.
    pub async fn list_notes(&self, book: BookId, note_type: Option<NoteType>) -> Result<Vec<Note>> {
        self.read(|tables| {
            live_book(tables, book)?;
            let mut query = Query::<Note>::new().book(book);
            if let Some(note_type) = note_type {
                query = query.note_type(note_type);
            }
            Ok(query.run(tables))
        })
        .await
    }

    /// Returns a live note, which must belong to `book`.
    pub async fn get_note(&self, book: BookId, note: NoteId) -> Result<Note> {
        self.read(|tables| note_in_book(tables, book, note)).await
    }

    /// Returns a live note of `book` together with its live relationships.
    pub async fn note_detail(&self, book: BookId, note: NoteId) -> Result<NoteDetail> {
        self.read(|tables| {
            let found = note_in_book(tables, book, note)?;
            let mut outgoing = Vec::new();
            let mut incoming = Vec::new();
            for rel in Query::<NoteRelationship>::new().touching(note).run(tables) {
                if rel.from_note_id == note {
                    if let Some(other) = Query::<Note>::by_id(rel.to_note_id).first(tables) {
                        outgoing.push((rel, other));
                    }
                } else if let Some(other) = Query::<Note>::by_id(rel.from_note_id).first(tables) {
                    incoming.push((rel, other));
                }
            }
            Ok(NoteDetail {
                note: found,
                outgoing,
                incoming,
            })
        })
        .await
    }

    /// Returns the live relationships with `note` at either end.
    pub async fn relationships_for_note(&self, note: NoteId) -> Result<Vec<NoteRelationship>> {
        self.read(|tables| {
            live_note(tables, note)?;
            Ok(Query::<NoteRelationship>::new().touching(note).run(tables))
        })
        .await
    }

    /// Returns the live relationships between notes of `book`.
    pub async fn relationships_for_book(&self, book: BookId) -> Result<Vec<NoteRelationship>> {
        self.read(|tables| {
            live_book(tables, book)?;
            let notes = Query::<Note>::new().book(book).run(tables);
            Ok(Query::<NoteRelationship>::new()
                .touching_any(notes.iter().map(|n| n.id))
                .run(tables))
        })
        .await
    }
}
