//! The full set of read tables derived from the event log.

use domain::{Book, LibraryEvent, Note, NoteRelationship, TableName};
use event_log::Sequence;

use crate::Result;
use crate::materialize::{MutationKind, TableMutation, materialize};
use crate::table::{Row, Table};

/// The `books`, `notes` and `noteRelationships` tables.
///
/// This is a disposable cache: it can be dropped and rebuilt at any time by
/// replaying the event log from empty. `position` records the sequence of the
/// last event applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadTables {
    books: Table<Book>,
    notes: Table<Note>,
    relationships: Table<NoteRelationship>,
    position: Sequence,
}

impl ReadTables {
    /// Creates empty tables positioned before the first event.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn books(&self) -> &Table<Book> {
        &self.books
    }

    pub fn notes(&self) -> &Table<Note> {
        &self.notes
    }

    pub fn relationships(&self) -> &Table<NoteRelationship> {
        &self.relationships
    }

    /// Selects a table by row type.
    pub fn table<R: Row>(&self) -> &Table<R> {
        R::table(self)
    }

    /// The sequence of the last applied event.
    pub fn position(&self) -> Sequence {
        self.position
    }

    /// Records that every event up to `sequence` has been applied.
    pub fn advance_to(&mut self, sequence: Sequence) {
        self.position = sequence;
    }

    /// Total rows in `table`, including soft-deleted rows.
    pub fn row_count(&self, table: TableName) -> usize {
        match table {
            TableName::Books => self.books.len(),
            TableName::Notes => self.notes.len(),
            TableName::NoteRelationships => self.relationships.len(),
        }
    }

    /// Rows in `table` that are not soft-deleted.
    pub fn live_count(&self, table: TableName) -> usize {
        match table {
            TableName::Books => self.books.live().count(),
            TableName::Notes => self.notes.live().count(),
            TableName::NoteRelationships => self.relationships.live().count(),
        }
    }

    /// Applies a mutation produced by [`materialize`] and returns the table
    /// it changed.
    pub fn apply(&mut self, mutation: TableMutation) -> Result<TableName> {
        let table = mutation.table();
        match mutation {
            TableMutation::Books(m) => write(&mut self.books, m.kind, m.row)?,
            TableMutation::Notes(m) => write(&mut self.notes, m.kind, m.row)?,
            TableMutation::NoteRelationships(m) => {
                write(&mut self.relationships, m.kind, m.row)?
            }
        }
        metrics::counter!("projections_events_materialized").increment(1);
        Ok(table)
    }

    /// Materializes `event` against the current state and applies the result.
    pub fn apply_event(&mut self, event: &LibraryEvent) -> Result<TableName> {
        let mutation = materialize(event, self)?;
        self.apply(mutation)
    }
}

fn write<R: Row>(table: &mut Table<R>, kind: MutationKind, row: R) -> Result<()> {
    match kind {
        MutationKind::Insert => table.insert(row),
        MutationKind::Update | MutationKind::SoftDelete => table.replace(row),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use common::{BookId, NoteId};
    use domain::{BookCreatedData, NoteCreatedData, NoteDeletedData, NoteType};

    #[test]
    fn counts_split_live_and_deleted_rows() {
        let mut tables = ReadTables::new();
        let book = BookId::new();
        let note = NoteId::new();
        let at = DateTime::from_timestamp_millis(1).unwrap();

        tables
            .apply_event(&LibraryEvent::BookCreated(BookCreatedData {
                id: book,
                title: "Dune".to_string(),
                author: None,
                created_at: at,
            }))
            .unwrap();
        let touched = tables
            .apply_event(&LibraryEvent::NoteCreated(NoteCreatedData {
                id: note,
                book_id: book,
                note_type: NoteType::Location,
                title: "Arrakis".to_string(),
                content: None,
                page_number: 2,
                metadata: None,
                created_at: at,
                updated_at: at,
            }))
            .unwrap();
        assert_eq!(touched, TableName::Notes);

        tables
            .apply_event(&LibraryEvent::NoteDeleted(NoteDeletedData {
                id: note,
                deleted_at: at,
            }))
            .unwrap();

        assert_eq!(tables.row_count(TableName::Books), 1);
        assert_eq!(tables.row_count(TableName::Notes), 1);
        assert_eq!(tables.live_count(TableName::Notes), 0);
        assert_eq!(tables.table::<Note>().len(), 1);
    }

    #[test]
    fn new_tables_start_before_first_event() {
        let tables = ReadTables::new();
        assert_eq!(tables.position(), Sequence::initial());
        assert!(tables.books().is_empty());
    }
}
