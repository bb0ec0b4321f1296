//! Materializers: the only path by which read tables change.
//!
//! [`materialize`] maps an event and the current table state to exactly one
//! row mutation. It never reads the clock or any other external state, so
//! replaying the same events from empty tables always yields the same rows.

use domain::{Book, EntityRef, LibraryEvent, Note, NoteRelationship, TableName};

use crate::table::{Row, Table};
use crate::{ProjectionError, ReadTables, Result};

/// What a mutation does to its row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Adds a new row.
    Insert,
    /// Patches fields of an existing row.
    Update,
    /// Sets `deletedAt` on an existing row.
    SoftDelete,
}

/// A single row mutation, carrying the row as it will be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation<R> {
    pub kind: MutationKind,
    pub row: R,
}

impl<R> Mutation<R> {
    fn insert(row: R) -> Self {
        Self {
            kind: MutationKind::Insert,
            row,
        }
    }

    fn update(row: R) -> Self {
        Self {
            kind: MutationKind::Update,
            row,
        }
    }

    fn soft_delete(row: R) -> Self {
        Self {
            kind: MutationKind::SoftDelete,
            row,
        }
    }
}

/// A mutation of one of the read tables.
#[derive(Debug, Clone, PartialEq)]
pub enum TableMutation {
    Books(Mutation<Book>),
    Notes(Mutation<Note>),
    NoteRelationships(Mutation<NoteRelationship>),
}

impl TableMutation {
    pub fn table(&self) -> TableName {
        match self {
            TableMutation::Books(_) => TableName::Books,
            TableMutation::Notes(_) => TableName::Notes,
            TableMutation::NoteRelationships(_) => TableName::NoteRelationships,
        }
    }

    pub fn kind(&self) -> MutationKind {
        match self {
            TableMutation::Books(m) => m.kind,
            TableMutation::Notes(m) => m.kind,
            TableMutation::NoteRelationships(m) => m.kind,
        }
    }

    /// The row being mutated.
    pub fn entity(&self) -> EntityRef {
        match self {
            TableMutation::Books(m) => m.row.entity(),
            TableMutation::Notes(m) => m.row.entity(),
            TableMutation::NoteRelationships(m) => m.row.entity(),
        }
    }
}

/// Returns the live row `id`, failing if it is missing or soft-deleted.
fn existing<R: Row>(table: &Table<R>, id: R::Id, entity: EntityRef) -> Result<R> {
    let row = table
        .get(id)
        .ok_or(ProjectionError::MissingRow(entity))?;
    if row.deleted_at().is_some() {
        return Err(ProjectionError::RowDeleted(entity));
    }
    Ok(row.clone())
}

fn vacant<R: Row>(table: &Table<R>, id: R::Id, entity: EntityRef) -> Result<()> {
    if table.contains(id) {
        return Err(ProjectionError::DuplicateKey(entity));
    }
    Ok(())
}

/// Computes the mutation `event` makes against `tables`.
///
/// Fails when the event cannot apply: an insert whose key is taken, or an
/// update or delete of a row that is missing or already soft-deleted.
pub fn materialize(event: &LibraryEvent, tables: &ReadTables) -> Result<TableMutation> {
    let entity = domain::DomainEvent::target(event);

    let mutation = match event {
        LibraryEvent::BookCreated(e) => {
            vacant(tables.books(), e.id, entity)?;
            TableMutation::Books(Mutation::insert(Book {
                id: e.id,
                title: e.title.clone(),
                author: e.author.clone(),
                current_page: None,
                created_at: e.created_at,
                deleted_at: None,
            }))
        }
        LibraryEvent::BookUpdated(e) => {
            let mut book = existing(tables.books(), e.id, entity)?;
            if let Some(title) = &e.title {
                book.title = title.clone();
            }
            if let Some(author) = &e.author {
                book.author = author.clone();
            }
            TableMutation::Books(Mutation::update(book))
        }
        LibraryEvent::BookProgressUpdated(e) => {
            let mut book = existing(tables.books(), e.id, entity)?;
            book.current_page = e.current_page;
            TableMutation::Books(Mutation::update(book))
        }
        LibraryEvent::BookDeleted(e) => {
            let mut book = existing(tables.books(), e.id, entity)?;
            book.deleted_at = Some(e.deleted_at);
            TableMutation::Books(Mutation::soft_delete(book))
        }
        LibraryEvent::NoteCreated(e) => {
            vacant(tables.notes(), e.id, entity)?;
            TableMutation::Notes(Mutation::insert(Note {
                id: e.id,
                book_id: e.book_id,
                note_type: e.note_type,
                title: e.title.clone(),
                content: e.content.clone(),
                page_number: e.page_number,
                metadata: e.metadata.clone(),
                created_at: e.created_at,
                updated_at: e.updated_at,
                deleted_at: None,
            }))
        }
        LibraryEvent::NoteUpdated(e) => {
            let mut note = existing(tables.notes(), e.id, entity)?;
            if let Some(note_type) = e.note_type {
                note.note_type = note_type;
            }
            if let Some(title) = &e.title {
                note.title = title.clone();
            }
            if let Some(content) = &e.content {
                note.content = content.clone();
            }
            if let Some(page_number) = e.page_number {
                note.page_number = page_number;
            }
            if let Some(metadata) = &e.metadata {
                note.metadata = metadata.clone();
            }
            note.updated_at = e.updated_at;
            TableMutation::Notes(Mutation::update(note))
        }
        LibraryEvent::NoteDeleted(e) => {
            let mut note = existing(tables.notes(), e.id, entity)?;
            note.deleted_at = Some(e.deleted_at);
            TableMutation::Notes(Mutation::soft_delete(note))
        }
        LibraryEvent::RelationshipCreated(e) => {
            vacant(tables.relationships(), e.id, entity)?;
            TableMutation::NoteRelationships(Mutation::insert(NoteRelationship {
                id: e.id,
                from_note_id: e.from_note_id,
                to_note_id: e.to_note_id,
                relationship_type: e.relationship_type,
                description: e.description.clone(),
                page_number: e.page_number,
                created_at: e.created_at,
                deleted_at: None,
            }))
        }
        LibraryEvent::RelationshipUpdated(e) => {
            let mut rel = existing(tables.relationships(), e.id, entity)?;
            if let Some(relationship_type) = e.relationship_type {
                rel.relationship_type = relationship_type;
            }
            if let Some(description) = &e.description {
                rel.description = description.clone();
            }
            if let Some(page_number) = e.page_number {
                rel.page_number = page_number;
            }
            TableMutation::NoteRelationships(Mutation::update(rel))
        }
        LibraryEvent::RelationshipDeleted(e) => {
            let mut rel = existing(tables.relationships(), e.id, entity)?;
            rel.deleted_at = Some(e.deleted_at);
            TableMutation::NoteRelationships(Mutation::soft_delete(rel))
        }
    };

    Ok(mutation)
}
