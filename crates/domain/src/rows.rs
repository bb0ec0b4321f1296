//! Read-table row types.

use chrono::{DateTime, Utc};
use common::{BookId, NoteId, RelationshipId};
use serde::{Deserialize, Serialize};

use crate::schema::TableName;
use crate::values::{NoteType, RelationshipType};

/// A row of the `books` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: Option<String>,
    /// The reader's last recorded page, used as the default visibility bound.
    pub current_page: Option<u32>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Book {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A row of the `notes` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub book_id: BookId,
    #[serde(rename = "type")]
    pub note_type: NoteType,
    pub title: String,
    pub content: Option<String>,
    /// The page at which the reader learned what this note records.
    pub page_number: u32,
    pub metadata: Option<serde_json::Value>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Note {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A row of the `noteRelationships` table: a directed edge between two notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRelationship {
    pub id: RelationshipId,
    pub from_note_id: NoteId,
    pub to_note_id: NoteId,
    pub relationship_type: RelationshipType,
    pub description: Option<String>,
    pub page_number: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl NoteRelationship {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns true if `note` is either endpoint.
    pub fn touches(&self, note: NoteId) -> bool {
        self.from_note_id == note || self.to_note_id == note
    }
}

/// A reference to a single row in one of the read tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "entity", content = "id", rename_all = "camelCase")]
pub enum EntityRef {
    Book(BookId),
    Note(NoteId),
    Relationship(RelationshipId),
}

impl EntityRef {
    /// The table holding the referenced row.
    pub fn table(&self) -> TableName {
        match self {
            EntityRef::Book(_) => TableName::Books,
            EntityRef::Note(_) => TableName::Notes,
            EntityRef::Relationship(_) => TableName::NoteRelationships,
        }
    }

    /// A human-readable entity kind.
    pub fn kind(&self) -> &'static str {
        match self {
            EntityRef::Book(_) => "book",
            EntityRef::Note(_) => "note",
            EntityRef::Relationship(_) => "relationship",
        }
    }

    /// The raw identifier of the referenced row.
    pub fn uuid(&self) -> uuid::Uuid {
        match self {
            EntityRef::Book(id) => id.as_uuid(),
            EntityRef::Note(id) => id.as_uuid(),
            EntityRef::Relationship(id) => id.as_uuid(),
        }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind(), self.uuid())
    }
}
