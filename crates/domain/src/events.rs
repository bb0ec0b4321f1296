//! Library events.
//!
//! Each event is a versioned, named fact. The wire form of an event is its
//! name plus a camelCase JSON payload; timestamps travel as epoch
//! milliseconds. Patch events distinguish an absent field ("leave as is")
//! from an explicit `null` ("clear it") through `Option<Option<T>>`.

use chrono::{DateTime, Utc};
use common::{BookId, NoteId, RelationshipId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{ValidationError, Violation, ViolationKind};
use crate::rows::EntityRef;
use crate::schema::{self, SchemaRegistry, TableName};
use crate::values::{NoteType, RelationshipType};

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and named in past tense.
pub trait DomainEvent: Send + Sync + Clone {
    /// Returns the versioned event name.
    ///
    /// This is the key under which the payload schema is registered and the
    /// name stored in the event log.
    fn event_type(&self) -> &'static str;

    /// Returns the row this event creates, changes or deletes.
    fn target(&self) -> EntityRef;
}

/// Deserializes a present field as `Some`, so that an explicit `null`
/// becomes `Some(None)` while a missing field stays `None` via `default`.
fn deserialize_some<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Data for `v1.BookCreated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BookCreatedData {
    pub id: BookId,
    pub title: String,
    pub author: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// Data for `v1.BookUpdated`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BookUpdatedData {
    pub id: BookId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub author: Option<Option<String>>,
}

/// Data for `v1.BookProgressUpdated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BookProgressUpdatedData {
    pub id: BookId,
    /// `None` clears the reader's progress.
    pub current_page: Option<u32>,
}

/// Data for `v1.BookDeleted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BookDeletedData {
    pub id: BookId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub deleted_at: DateTime<Utc>,
}

/// Data for `v1.NoteCreated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NoteCreatedData {
    pub id: NoteId,
    pub book_id: BookId,
    #[serde(rename = "type")]
    pub note_type: NoteType,
    pub title: String,
    pub content: Option<String>,
    pub page_number: u32,
    pub metadata: Option<Value>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

/// Data for `v1.NoteUpdated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NoteUpdatedData {
    pub id: NoteId,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub note_type: Option<NoteType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub content: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub metadata: Option<Option<Value>>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

/// Data for `v1.NoteDeleted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NoteDeletedData {
    pub id: NoteId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub deleted_at: DateTime<Utc>,
}

/// Data for `v1.RelationshipCreated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RelationshipCreatedData {
    pub id: RelationshipId,
    pub from_note_id: NoteId,
    pub to_note_id: NoteId,
    pub relationship_type: RelationshipType,
    pub description: Option<String>,
    pub page_number: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// Data for `v1.RelationshipUpdated`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RelationshipUpdatedData {
    pub id: RelationshipId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_type: Option<RelationshipType>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}

/// Data for `v1.RelationshipDeleted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RelationshipDeletedData {
    pub id: RelationshipId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub deleted_at: DateTime<Utc>,
}

/// Every event the store accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum LibraryEvent {
    BookCreated(BookCreatedData),
    BookUpdated(BookUpdatedData),
    BookProgressUpdated(BookProgressUpdatedData),
    BookDeleted(BookDeletedData),
    NoteCreated(NoteCreatedData),
    NoteUpdated(NoteUpdatedData),
    NoteDeleted(NoteDeletedData),
    RelationshipCreated(RelationshipCreatedData),
    RelationshipUpdated(RelationshipUpdatedData),
    RelationshipDeleted(RelationshipDeletedData),
}

impl DomainEvent for LibraryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LibraryEvent::BookCreated(_) => schema::BOOK_CREATED,
            LibraryEvent::BookUpdated(_) => schema::BOOK_UPDATED,
            LibraryEvent::BookProgressUpdated(_) => schema::BOOK_PROGRESS_UPDATED,
            LibraryEvent::BookDeleted(_) => schema::BOOK_DELETED,
            LibraryEvent::NoteCreated(_) => schema::NOTE_CREATED,
            LibraryEvent::NoteUpdated(_) => schema::NOTE_UPDATED,
            LibraryEvent::NoteDeleted(_) => schema::NOTE_DELETED,
            LibraryEvent::RelationshipCreated(_) => schema::RELATIONSHIP_CREATED,
            LibraryEvent::RelationshipUpdated(_) => schema::RELATIONSHIP_UPDATED,
            LibraryEvent::RelationshipDeleted(_) => schema::RELATIONSHIP_DELETED,
        }
    }

    fn target(&self) -> EntityRef {
        match self {
            LibraryEvent::BookCreated(e) => EntityRef::Book(e.id),
            LibraryEvent::BookUpdated(e) => EntityRef::Book(e.id),
            LibraryEvent::BookProgressUpdated(e) => EntityRef::Book(e.id),
            LibraryEvent::BookDeleted(e) => EntityRef::Book(e.id),
            LibraryEvent::NoteCreated(e) => EntityRef::Note(e.id),
            LibraryEvent::NoteUpdated(e) => EntityRef::Note(e.id),
            LibraryEvent::NoteDeleted(e) => EntityRef::Note(e.id),
            LibraryEvent::RelationshipCreated(e) => EntityRef::Relationship(e.id),
            LibraryEvent::RelationshipUpdated(e) => EntityRef::Relationship(e.id),
            LibraryEvent::RelationshipDeleted(e) => EntityRef::Relationship(e.id),
        }
    }
}

impl LibraryEvent {
    /// The read table this event touches.
    pub fn table(&self) -> TableName {
        self.target().table()
    }

    /// Returns true for the deletion events.
    pub fn is_deletion(&self) -> bool {
        matches!(
            self,
            LibraryEvent::BookDeleted(_)
                | LibraryEvent::NoteDeleted(_)
                | LibraryEvent::RelationshipDeleted(_)
        )
    }

    /// Serializes the event data into its wire payload.
    pub fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            LibraryEvent::BookCreated(e) => serde_json::to_value(e),
            LibraryEvent::BookUpdated(e) => serde_json::to_value(e),
            LibraryEvent::BookProgressUpdated(e) => serde_json::to_value(e),
            LibraryEvent::BookDeleted(e) => serde_json::to_value(e),
            LibraryEvent::NoteCreated(e) => serde_json::to_value(e),
            LibraryEvent::NoteUpdated(e) => serde_json::to_value(e),
            LibraryEvent::NoteDeleted(e) => serde_json::to_value(e),
            LibraryEvent::RelationshipCreated(e) => serde_json::to_value(e),
            LibraryEvent::RelationshipUpdated(e) => serde_json::to_value(e),
            LibraryEvent::RelationshipDeleted(e) => serde_json::to_value(e),
        }
    }

    /// Validates a named payload and decodes it into an event.
    ///
    /// The payload is checked against the registered schema first, so every
    /// field-level problem is reported together.
    pub fn from_parts(event_type: &str, payload: Value) -> Result<Self, ValidationError> {
        SchemaRegistry::v1().validate(event_type, &payload)?;

        let event = match event_type {
            schema::BOOK_CREATED => LibraryEvent::BookCreated(decode(event_type, payload)?),
            schema::BOOK_UPDATED => LibraryEvent::BookUpdated(decode(event_type, payload)?),
            schema::BOOK_PROGRESS_UPDATED => {
                LibraryEvent::BookProgressUpdated(decode(event_type, payload)?)
            }
            schema::BOOK_DELETED => LibraryEvent::BookDeleted(decode(event_type, payload)?),
            schema::NOTE_CREATED => LibraryEvent::NoteCreated(decode(event_type, payload)?),
            schema::NOTE_UPDATED => LibraryEvent::NoteUpdated(decode(event_type, payload)?),
            schema::NOTE_DELETED => LibraryEvent::NoteDeleted(decode(event_type, payload)?),
            schema::RELATIONSHIP_CREATED => {
                LibraryEvent::RelationshipCreated(decode(event_type, payload)?)
            }
            schema::RELATIONSHIP_UPDATED => {
                LibraryEvent::RelationshipUpdated(decode(event_type, payload)?)
            }
            schema::RELATIONSHIP_DELETED => {
                LibraryEvent::RelationshipDeleted(decode(event_type, payload)?)
            }
            other => return Err(ValidationError::UnknownEvent(other.to_string())),
        };

        Ok(event)
    }

    /// Checks a typed event against its schema by round-tripping it through
    /// the wire payload. Catches constraints the Rust types cannot express,
    /// such as title length or a zero page number.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let payload = self.payload().map_err(|e| malformed(self.event_type(), e))?;
        SchemaRegistry::v1().validate(self.event_type(), &payload)
    }
}

fn decode<T: DeserializeOwned>(event_type: &str, payload: Value) -> Result<T, ValidationError> {
    serde_json::from_value(payload).map_err(|e| malformed(event_type, e))
}

fn malformed(event_type: &str, err: serde_json::Error) -> ValidationError {
    ValidationError::Payload {
        event_type: event_type.to_string(),
        violations: vec![Violation::new(
            "payload",
            ViolationKind::Malformed(err.to_string()),
        )],
    }
}
