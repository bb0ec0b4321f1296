//! Read tables: insertion-ordered rows with a primary-key index.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use common::{BookId, NoteId, RelationshipId};
use domain::{Book, EntityRef, Note, NoteRelationship, TableName};

use crate::{ProjectionError, ReadTables, Result};

/// A row type stored in one of the read tables.
pub trait Row: Clone + Send + Sync + 'static {
    /// The primary key type.
    type Id: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    /// The table this row type lives in.
    const TABLE: TableName;

    fn id(&self) -> Self::Id;

    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    /// A reference to this row usable in errors and reports.
    fn entity(&self) -> EntityRef;

    /// Selects this row type's table out of the full set.
    fn table(tables: &ReadTables) -> &Table<Self>;
}

impl Row for Book {
    type Id = BookId;
    const TABLE: TableName = TableName::Books;

    fn id(&self) -> BookId {
        self.id
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    fn entity(&self) -> EntityRef {
        EntityRef::Book(self.id)
    }

    fn table(tables: &ReadTables) -> &Table<Self> {
        tables.books()
    }
}

impl Row for Note {
    type Id = NoteId;
    const TABLE: TableName = TableName::Notes;

    fn id(&self) -> NoteId {
        self.id
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    fn entity(&self) -> EntityRef {
        EntityRef::Note(self.id)
    }

    fn table(tables: &ReadTables) -> &Table<Self> {
        tables.notes()
    }
}

impl Row for NoteRelationship {
    type Id = RelationshipId;
    const TABLE: TableName = TableName::NoteRelationships;

    fn id(&self) -> RelationshipId {
        self.id
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    fn entity(&self) -> EntityRef {
        EntityRef::Relationship(self.id)
    }

    fn table(tables: &ReadTables) -> &Table<Self> {
        tables.relationships()
    }
}

/// A mapping from primary key to row that remembers insertion order.
///
/// Rows are never removed; soft deletes replace the row in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<R: Row> {
    rows: Vec<R>,
    index: HashMap<R::Id, usize>,
}

impl<R: Row> Table<R> {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Looks up a row by primary key, including soft-deleted rows.
    pub fn get(&self, id: R::Id) -> Option<&R> {
        self.index.get(&id).map(|&pos| &self.rows[pos])
    }

    /// Returns true if a row with this key exists, deleted or not.
    pub fn contains(&self, id: R::Id) -> bool {
        self.index.contains_key(&id)
    }

    /// Iterates every row in insertion order, including soft-deleted rows.
    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.rows.iter()
    }

    /// Iterates the rows that are not soft-deleted, in insertion order.
    pub fn live(&self) -> impl Iterator<Item = &R> {
        self.rows.iter().filter(|r| r.deleted_at().is_none())
    }

    /// Total number of rows, including soft-deleted rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn insert(&mut self, row: R) -> Result<()> {
        if self.index.contains_key(&row.id()) {
            return Err(ProjectionError::DuplicateKey(row.entity()));
        }
        self.index.insert(row.id(), self.rows.len());
        self.rows.push(row);
        Ok(())
    }

    pub(crate) fn replace(&mut self, row: R) -> Result<()> {
        let pos = *self
            .index
            .get(&row.id())
            .ok_or_else(|| ProjectionError::MissingRow(row.entity()))?;
        self.rows[pos] = row;
        Ok(())
    }
}

impl<R: Row> Default for Table<R> {
    fn default() -> Self {
        Self::new()
    }
}
