//! Declarative queries over the read tables.

use std::cmp::Ordering;
use std::sync::Arc;

use common::{BookId, NoteId};
use domain::{Note, NoteRelationship, NoteType, RelationshipType};

use crate::ReadTables;
use crate::table::Row;

type Predicate<R> = Arc<dyn Fn(&R) -> bool + Send + Sync>;
type Comparator<R> = Arc<dyn Fn(&R, &R) -> Ordering + Send + Sync>;

/// A query against the table holding `R`.
///
/// Soft-deleted rows are excluded unless [`include_deleted`](Self::include_deleted)
/// is called. Results come back in insertion order unless a sort is given.
/// Queries are cheap to clone, which live subscriptions rely on.
pub struct Query<R: Row> {
    id: Option<R::Id>,
    include_deleted: bool,
    filters: Vec<Predicate<R>>,
    sort: Option<Comparator<R>>,
}

impl<R: Row> Clone for Query<R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            include_deleted: self.include_deleted,
            filters: self.filters.clone(),
            sort: self.sort.clone(),
        }
    }
}

impl<R: Row> std::fmt::Debug for Query<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("table", &R::TABLE)
            .field("id", &self.id)
            .field("include_deleted", &self.include_deleted)
            .field("filters", &self.filters.len())
            .field("sorted", &self.sort.is_some())
            .finish()
    }
}

impl<R: Row> Default for Query<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Row> Query<R> {
    /// Matches every live row of the table.
    pub fn new() -> Self {
        Self {
            id: None,
            include_deleted: false,
            filters: Vec::new(),
            sort: None,
        }
    }

    /// Matches the row with this primary key.
    pub fn by_id(id: R::Id) -> Self {
        Self::new().id(id)
    }

    /// Restricts to the row with this primary key.
    pub fn id(mut self, id: R::Id) -> Self {
        self.id = Some(id);
        self
    }

    /// Also returns soft-deleted rows.
    pub fn include_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    /// Adds an arbitrary row predicate. All predicates must hold.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        self.filters.push(Arc::new(predicate));
        self
    }

    /// Sorts results with `compare`. The sort is stable, so ties keep
    /// insertion order.
    pub fn sort_by<F>(mut self, compare: F) -> Self
    where
        F: Fn(&R, &R) -> Ordering + Send + Sync + 'static,
    {
        self.sort = Some(Arc::new(compare));
        self
    }

    /// Sorts results by a key.
    pub fn sort_by_key<K, F>(self, key: F) -> Self
    where
        K: Ord,
        F: Fn(&R) -> K + Send + Sync + 'static,
    {
        self.sort_by(move |a, b| key(a).cmp(&key(b)))
    }

    fn matches(&self, row: &R) -> bool {
        (self.include_deleted || row.deleted_at().is_none())
            && self.filters.iter().all(|f| f(row))
    }

    /// Evaluates the query against `tables`.
    pub fn run(&self, tables: &ReadTables) -> Vec<R> {
        let table = tables.table::<R>();

        let mut rows: Vec<R> = match self.id {
            Some(id) => table
                .get(id)
                .filter(|row| self.matches(row))
                .cloned()
                .into_iter()
                .collect(),
            None => table
                .iter()
                .filter(|row| self.matches(row))
                .cloned()
                .collect(),
        };

        if let Some(sort) = &self.sort {
            rows.sort_by(|a, b| sort(a, b));
        }
        rows
    }

    /// Evaluates the query and returns the first row, if any.
    pub fn first(&self, tables: &ReadTables) -> Option<R> {
        if self.sort.is_some() {
            return self.run(tables).into_iter().next();
        }

        let table = tables.table::<R>();
        match self.id {
            Some(id) => table.get(id).filter(|row| self.matches(row)).cloned(),
            None => table.iter().find(|row| self.matches(row)).cloned(),
        }
    }

    /// Counts matching rows.
    pub fn count(&self, tables: &ReadTables) -> usize {
        match self.id {
            Some(_) => self.run(tables).len(),
            None => tables
                .table::<R>()
                .iter()
                .filter(|row| self.matches(row))
                .count(),
        }
    }
}

impl Query<Note> {
    /// Restricts to notes attached to `book`.
    pub fn book(self, book: BookId) -> Self {
        self.filter(move |note| note.book_id == book)
    }

    /// Restricts to notes of one type.
    pub fn note_type(self, note_type: NoteType) -> Self {
        self.filter(move |note| note.note_type == note_type)
    }
}

impl Query<NoteRelationship> {
    /// Restricts to relationships with `note` at either end.
    pub fn touching(self, note: NoteId) -> Self {
        self.filter(move |rel| rel.touches(note))
    }

    /// Restricts to relationships with at least one end in `notes`.
    pub fn touching_any(self, notes: impl IntoIterator<Item = NoteId>) -> Self {
        let notes: std::collections::HashSet<NoteId> = notes.into_iter().collect();
        self.filter(move |rel| notes.contains(&rel.from_note_id) || notes.contains(&rel.to_note_id))
    }

    /// Restricts to relationships starting at `note`.
    pub fn from_note(self, note: NoteId) -> Self {
        self.filter(move |rel| rel.from_note_id == note)
    }

    /// Restricts to relationships ending at `note`.
    pub fn to_note(self, note: NoteId) -> Self {
        self.filter(move |rel| rel.to_note_id == note)
    }

    /// Restricts to relationships of one type.
    pub fn relationship_type(self, relationship_type: RelationshipType) -> Self {
        self.filter(move |rel| rel.relationship_type == relationship_type)
    }
}
