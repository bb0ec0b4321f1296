//! Command inputs for the service operations.
//!
//! Identifiers and creation timestamps are chosen by the caller when the
//! command is built, so retrying a command never mints a second entity.

use chrono::{DateTime, Utc};
use common::{BookId, NoteId, RelationshipId};
use domain::{NoteType, RelationshipType};
use serde_json::Value;

/// Command to add a book.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateBook {
    pub id: BookId,
    pub title: String,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CreateBook {
    /// Creates a command with a fresh ID, timestamped now.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: BookId::new(),
            title: title.into(),
            author: None,
            created_at: Utc::now(),
        }
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}

/// Command to patch a book. Unset fields are left as they are.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateBook {
    pub id: BookId,
    pub title: Option<String>,
    /// `Some(None)` clears the author.
    pub author: Option<Option<String>>,
}

impl UpdateBook {
    pub fn new(id: BookId) -> Self {
        Self {
            id,
            title: None,
            author: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn author(mut self, author: Option<String>) -> Self {
        self.author = Some(author);
        self
    }
}

/// Command to attach a note to a book.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateNote {
    pub id: NoteId,
    pub book_id: BookId,
    pub note_type: NoteType,
    pub title: String,
    pub content: Option<String>,
    pub page_number: u32,
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl CreateNote {
    /// Creates a command with a fresh ID, timestamped now.
    pub fn new(
        book_id: BookId,
        note_type: NoteType,
        title: impl Into<String>,
        page_number: u32,
    ) -> Self {
        Self {
            id: NoteId::new(),
            book_id,
            note_type,
            title: title.into(),
            content: None,
            page_number,
            metadata: None,
            created_at: Utc::now(),
        }
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Command to patch a note. Unset fields are left as they are.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateNote {
    pub id: NoteId,
    pub note_type: Option<NoteType>,
    pub title: Option<String>,
    /// `Some(None)` clears the content.
    pub content: Option<Option<String>>,
    pub page_number: Option<u32>,
    /// `Some(None)` clears the metadata.
    pub metadata: Option<Option<Value>>,
    pub updated_at: DateTime<Utc>,
}

impl UpdateNote {
    /// Creates an empty patch timestamped now.
    pub fn new(id: NoteId) -> Self {
        Self {
            id,
            note_type: None,
            title: None,
            content: None,
            page_number: None,
            metadata: None,
            updated_at: Utc::now(),
        }
    }

    pub fn note_type(mut self, note_type: NoteType) -> Self {
        self.note_type = Some(note_type);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn content(mut self, content: Option<String>) -> Self {
        self.content = Some(content);
        self
    }

    pub fn page_number(mut self, page_number: u32) -> Self {
        self.page_number = Some(page_number);
        self
    }

    pub fn metadata(mut self, metadata: Option<Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Command to relate two notes of the same book.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRelationship {
    pub id: RelationshipId,
    pub from_note_id: NoteId,
    pub to_note_id: NoteId,
    pub relationship_type: RelationshipType,
    pub description: Option<String>,
    pub page_number: u32,
    pub created_at: DateTime<Utc>,
}

impl CreateRelationship {
    /// Creates a command with a fresh ID, timestamped now.
    pub fn new(
        from_note_id: NoteId,
        to_note_id: NoteId,
        relationship_type: RelationshipType,
        page_number: u32,
    ) -> Self {
        Self {
            id: RelationshipId::new(),
            from_note_id,
            to_note_id,
            relationship_type,
            description: None,
            page_number,
            created_at: Utc::now(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Command to patch a relationship. Unset fields are left as they are.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRelationship {
    pub id: RelationshipId,
    pub relationship_type: Option<RelationshipType>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub page_number: Option<u32>,
}

impl UpdateRelationship {
    pub fn new(id: RelationshipId) -> Self {
        Self {
            id,
            relationship_type: None,
            description: None,
            page_number: None,
        }
    }

    pub fn relationship_type(mut self, relationship_type: RelationshipType) -> Self {
        self.relationship_type = Some(relationship_type);
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn page_number(mut self, page_number: u32) -> Self {
        self.page_number = Some(page_number);
        self
    }
}
