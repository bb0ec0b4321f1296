//! Domain layer for the reading-companion store.
//!
//! This crate provides:
//! - The closed note and relationship type domains
//! - Versioned event definitions and the `DomainEvent` trait
//! - The schema registry that validates event payloads
//! - Read-table row types

pub mod error;
pub mod events;
pub mod rows;
pub mod schema;
pub mod values;

pub use error::{ValidationError, Violation, ViolationKind};
pub use events::{
    BookCreatedData, BookDeletedData, BookProgressUpdatedData, BookUpdatedData, DomainEvent,
    LibraryEvent, NoteCreatedData, NoteDeletedData, NoteUpdatedData, RelationshipCreatedData,
    RelationshipDeletedData, RelationshipUpdatedData,
};
pub use rows::{Book, EntityRef, Note, NoteRelationship};
pub use schema::{
    ColumnSpec, EventSchema, FieldKind, FieldSpec, Presence, SchemaRegistry, TableName,
    TableSchema,
};
pub use values::{NoteType, RelationshipType};
