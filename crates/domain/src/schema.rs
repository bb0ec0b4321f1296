//! Schema registry: declared event payload contracts and read-table shapes.
//!
//! Event names carry a version prefix. A payload is validated against the
//! schema registered under its name before it may reach the event log.

use serde_json::{Map, Value};

use crate::error::{ValidationError, Violation, ViolationKind};
use crate::values::{
    AUTHOR_MAX_LEN, CONTENT_MAX_LEN, DESCRIPTION_MAX_LEN, NoteType, RelationshipType,
    TITLE_MAX_LEN,
};

pub const BOOK_CREATED: &str = "v1.BookCreated";
pub const BOOK_UPDATED: &str = "v1.BookUpdated";
pub const BOOK_PROGRESS_UPDATED: &str = "v1.BookProgressUpdated";
pub const BOOK_DELETED: &str = "v1.BookDeleted";
pub const NOTE_CREATED: &str = "v1.NoteCreated";
pub const NOTE_UPDATED: &str = "v1.NoteUpdated";
pub const NOTE_DELETED: &str = "v1.NoteDeleted";
pub const RELATIONSHIP_CREATED: &str = "v1.RelationshipCreated";
pub const RELATIONSHIP_UPDATED: &str = "v1.RelationshipUpdated";
pub const RELATIONSHIP_DELETED: &str = "v1.RelationshipDeleted";

/// The value domain of a field or column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A caller-generated UUID in string form.
    Id,
    /// A string whose character count lies in `min..=max`.
    Text { min: usize, max: usize },
    /// An integer in `1..=u32::MAX`.
    PositiveInt,
    /// Milliseconds since the Unix epoch.
    Timestamp,
    /// One string out of a closed set.
    Enum(&'static [&'static str]),
    /// Any JSON value; opaque to the store.
    Json,
}

/// Whether a field must appear in the payload and whether it may be `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Present and non-null.
    Required,
    /// Present, possibly null.
    Nullable,
    /// May be absent; if present, non-null.
    Optional,
    /// May be absent or null.
    OptionalNullable,
}

impl Presence {
    fn may_be_absent(self) -> bool {
        matches!(self, Presence::Optional | Presence::OptionalNullable)
    }

    fn may_be_null(self) -> bool {
        matches!(self, Presence::Nullable | Presence::OptionalNullable)
    }
}

/// A declared payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub presence: Presence,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind, presence: Presence) -> Self {
        Self {
            name,
            kind,
            presence,
        }
    }

    const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self::new(name, kind, Presence::Required)
    }

    const fn nullable(name: &'static str, kind: FieldKind) -> Self {
        Self::new(name, kind, Presence::Nullable)
    }

    const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self::new(name, kind, Presence::Optional)
    }

    const fn patch(name: &'static str, kind: FieldKind) -> Self {
        Self::new(name, kind, Presence::OptionalNullable)
    }
}

/// The payload contract of one named event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventSchema {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl EventSchema {
    /// Validates a payload, collecting every violation rather than stopping
    /// at the first.
    pub fn validate(&self, payload: &Value) -> Result<(), ValidationError> {
        let violations = match payload.as_object() {
            Some(object) => self.violations(object),
            None => vec![Violation::new(
                "payload",
                ViolationKind::WrongType {
                    expected: "an object",
                },
            )],
        };

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::Payload {
                event_type: self.name.to_string(),
                violations,
            })
        }
    }

    fn violations(&self, object: &Map<String, Value>) -> Vec<Violation> {
        let mut violations = Vec::new();

        for field in self.fields {
            match object.get(field.name) {
                None if field.presence.may_be_absent() => {}
                None => violations.push(Violation::new(field.name, ViolationKind::Missing)),
                Some(Value::Null) if field.presence.may_be_null() => {}
                Some(Value::Null) => violations.push(Violation::new(field.name, ViolationKind::Null)),
                Some(value) => {
                    if let Some(kind) = check_kind(field.kind, value) {
                        violations.push(Violation::new(field.name, kind));
                    }
                }
            }
        }

        for key in object.keys() {
            if !self.fields.iter().any(|f| f.name == key) {
                violations.push(Violation::new(key.clone(), ViolationKind::Unknown));
            }
        }

        violations
    }
}

fn check_kind(kind: FieldKind, value: &Value) -> Option<ViolationKind> {
    match kind {
        FieldKind::Id => match value.as_str() {
            None => Some(ViolationKind::WrongType {
                expected: "a string",
            }),
            Some(s) if uuid::Uuid::parse_str(s).is_err() => Some(ViolationKind::InvalidId),
            Some(_) => None,
        },
        FieldKind::Text { min, max } => match value.as_str() {
            None => Some(ViolationKind::WrongType {
                expected: "a string",
            }),
            Some(s) => {
                let len = s.chars().count();
                if len < min {
                    Some(ViolationKind::TooShort { min })
                } else if len > max {
                    Some(ViolationKind::TooLong { max })
                } else {
                    None
                }
            }
        },
        FieldKind::PositiveInt => {
            if !value.is_i64() && !value.is_u64() {
                return Some(ViolationKind::WrongType {
                    expected: "an integer",
                });
            }
            match value.as_u64() {
                Some(n) if n >= 1 && n <= u64::from(u32::MAX) => None,
                _ => Some(ViolationKind::NotPositive),
            }
        }
        FieldKind::Timestamp => {
            if value.is_i64() || value.is_u64() {
                None
            } else {
                Some(ViolationKind::WrongType {
                    expected: "a millisecond timestamp",
                })
            }
        }
        FieldKind::Enum(allowed) => match value.as_str() {
            None => Some(ViolationKind::WrongType {
                expected: "a string",
            }),
            Some(s) if !allowed.contains(&s) => Some(ViolationKind::NotInSet { allowed }),
            Some(_) => None,
        },
        FieldKind::Json => None,
    }
}

/// The read tables materialized from the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableName {
    Books,
    Notes,
    NoteRelationships,
}

impl TableName {
    pub const ALL: [TableName; 3] = [
        TableName::Books,
        TableName::Notes,
        TableName::NoteRelationships,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::Books => "books",
            TableName::Notes => "notes",
            TableName::NoteRelationships => "noteRelationships",
        }
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A declared read-table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
}

impl ColumnSpec {
    const fn not_null(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
        }
    }

    const fn nullable(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: true,
        }
    }
}

/// The shape of one read table. The first column is the primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub name: TableName,
    pub columns: &'static [ColumnSpec],
}

impl TableSchema {
    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }
}

const TITLE: FieldKind = FieldKind::Text {
    min: 1,
    max: TITLE_MAX_LEN,
};
const AUTHOR: FieldKind = FieldKind::Text {
    min: 0,
    max: AUTHOR_MAX_LEN,
};
const CONTENT: FieldKind = FieldKind::Text {
    min: 0,
    max: CONTENT_MAX_LEN,
};
const DESCRIPTION: FieldKind = FieldKind::Text {
    min: 0,
    max: DESCRIPTION_MAX_LEN,
};
const NOTE_TYPE: FieldKind = FieldKind::Enum(NoteType::NAMES);
const RELATIONSHIP_TYPE: FieldKind = FieldKind::Enum(RelationshipType::NAMES);

static EVENT_SCHEMAS: &[EventSchema] = &[
    EventSchema {
        name: BOOK_CREATED,
        fields: &[
            FieldSpec::required("id", FieldKind::Id),
            FieldSpec::required("title", TITLE),
            FieldSpec::nullable("author", AUTHOR),
            FieldSpec::required("createdAt", FieldKind::Timestamp),
        ],
    },
    EventSchema {
        name: BOOK_UPDATED,
        fields: &[
            FieldSpec::required("id", FieldKind::Id),
            FieldSpec::optional("title", TITLE),
            FieldSpec::patch("author", AUTHOR),
        ],
    },
    EventSchema {
        name: BOOK_PROGRESS_UPDATED,
        fields: &[
            FieldSpec::required("id", FieldKind::Id),
            FieldSpec::nullable("currentPage", FieldKind::PositiveInt),
        ],
    },
    EventSchema {
        name: BOOK_DELETED,
        fields: &[
            FieldSpec::required("id", FieldKind::Id),
            FieldSpec::required("deletedAt", FieldKind::Timestamp),
        ],
    },
    EventSchema {
        name: NOTE_CREATED,
        fields: &[
            FieldSpec::required("id", FieldKind::Id),
            FieldSpec::required("bookId", FieldKind::Id),
            FieldSpec::required("type", NOTE_TYPE),
            FieldSpec::required("title", TITLE),
            FieldSpec::nullable("content", CONTENT),
            FieldSpec::required("pageNumber", FieldKind::PositiveInt),
            FieldSpec::nullable("metadata", FieldKind::Json),
            FieldSpec::required("createdAt", FieldKind::Timestamp),
            FieldSpec::required("updatedAt", FieldKind::Timestamp),
        ],
    },
    EventSchema {
        name: NOTE_UPDATED,
        fields: &[
            FieldSpec::required("id", FieldKind::Id),
            FieldSpec::optional("type", NOTE_TYPE),
            FieldSpec::optional("title", TITLE),
            FieldSpec::patch("content", CONTENT),
            FieldSpec::optional("pageNumber", FieldKind::PositiveInt),
            FieldSpec::patch("metadata", FieldKind::Json),
            FieldSpec::required("updatedAt", FieldKind::Timestamp),
        ],
    },
    EventSchema {
        name: NOTE_DELETED,
        fields: &[
            FieldSpec::required("id", FieldKind::Id),
            FieldSpec::required("deletedAt", FieldKind::Timestamp),
        ],
    },
    EventSchema {
        name: RELATIONSHIP_CREATED,
        fields: &[
            FieldSpec::required("id", FieldKind::Id),
            FieldSpec::required("fromNoteId", FieldKind::Id),
            FieldSpec::required("toNoteId", FieldKind::Id),
            FieldSpec::required("relationshipType", RELATIONSHIP_TYPE),
            FieldSpec::nullable("description", DESCRIPTION),
            FieldSpec::required("pageNumber", FieldKind::PositiveInt),
            FieldSpec::required("createdAt", FieldKind::Timestamp),
        ],
    },
    EventSchema {
        name: RELATIONSHIP_UPDATED,
        fields: &[
            FieldSpec::required("id", FieldKind::Id),
            FieldSpec::optional("relationshipType", RELATIONSHIP_TYPE),
            FieldSpec::patch("description", DESCRIPTION),
            FieldSpec::optional("pageNumber", FieldKind::PositiveInt),
        ],
    },
    EventSchema {
        name: RELATIONSHIP_DELETED,
        fields: &[
            FieldSpec::required("id", FieldKind::Id),
            FieldSpec::required("deletedAt", FieldKind::Timestamp),
        ],
    },
];

static BOOKS_TABLE: TableSchema = TableSchema {
    name: TableName::Books,
    columns: &[
        ColumnSpec::not_null("id", FieldKind::Id),
        ColumnSpec::not_null("title", TITLE),
        ColumnSpec::nullable("author", AUTHOR),
        ColumnSpec::nullable("currentPage", FieldKind::PositiveInt),
        ColumnSpec::not_null("createdAt", FieldKind::Timestamp),
        ColumnSpec::nullable("deletedAt", FieldKind::Timestamp),
    ],
};

static NOTES_TABLE: TableSchema = TableSchema {
    name: TableName::Notes,
    columns: &[
        ColumnSpec::not_null("id", FieldKind::Id),
        ColumnSpec::not_null("bookId", FieldKind::Id),
        ColumnSpec::not_null("type", NOTE_TYPE),
        ColumnSpec::not_null("title", TITLE),
        ColumnSpec::nullable("content", CONTENT),
        ColumnSpec::not_null("pageNumber", FieldKind::PositiveInt),
        ColumnSpec::nullable("metadata", FieldKind::Json),
        ColumnSpec::not_null("createdAt", FieldKind::Timestamp),
        ColumnSpec::not_null("updatedAt", FieldKind::Timestamp),
        ColumnSpec::nullable("deletedAt", FieldKind::Timestamp),
    ],
};

static RELATIONSHIPS_TABLE: TableSchema = TableSchema {
    name: TableName::NoteRelationships,
    columns: &[
        ColumnSpec::not_null("id", FieldKind::Id),
        ColumnSpec::not_null("fromNoteId", FieldKind::Id),
        ColumnSpec::not_null("toNoteId", FieldKind::Id),
        ColumnSpec::not_null("relationshipType", RELATIONSHIP_TYPE),
        ColumnSpec::nullable("description", DESCRIPTION),
        ColumnSpec::not_null("pageNumber", FieldKind::PositiveInt),
        ColumnSpec::not_null("createdAt", FieldKind::Timestamp),
        ColumnSpec::nullable("deletedAt", FieldKind::Timestamp),
    ],
};

/// Lookup over every registered event and table schema.
#[derive(Debug, Clone, Copy)]
pub struct SchemaRegistry {
    events: &'static [EventSchema],
}

impl SchemaRegistry {
    /// The registry of `v1` event schemas and their read tables.
    pub fn v1() -> Self {
        Self {
            events: EVENT_SCHEMAS,
        }
    }

    /// Returns the schema registered under `name`.
    pub fn event(&self, name: &str) -> Option<&'static EventSchema> {
        self.events.iter().find(|s| s.name == name)
    }

    /// Returns every registered event schema.
    pub fn events(&self) -> &'static [EventSchema] {
        self.events
    }

    /// Returns the shape of `table`.
    pub fn table(&self, table: TableName) -> &'static TableSchema {
        match table {
            TableName::Books => &BOOKS_TABLE,
            TableName::Notes => &NOTES_TABLE,
            TableName::NoteRelationships => &RELATIONSHIPS_TABLE,
        }
    }

    /// Validates `payload` against the schema registered under `event_type`.
    pub fn validate(&self, event_type: &str, payload: &Value) -> Result<(), ValidationError> {
        self.event(event_type)
            .ok_or_else(|| ValidationError::UnknownEvent(event_type.to_string()))?
            .validate(payload)
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::v1()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn note_created() -> Value {
        json!({
            "id": "6c5f1a3e-3c1b-4d0e-9a57-1f7c1c0b9f11",
            "bookId": "0d3a4d9e-2c4b-4a8b-8f0e-8e6c2f9a7b12",
            "type": "character",
            "title": "Paul",
            "content": null,
            "pageNumber": 1,
            "metadata": null,
            "createdAt": 1_700_000_000_000i64,
            "updatedAt": 1_700_000_000_000i64
        })
    }

    #[test]
    fn every_table_is_registered() {
        let registry = SchemaRegistry::v1();
        for table in TableName::ALL {
            assert_eq!(registry.table(table).name, table);
        }
    }

    #[test]
    fn event_names_are_unique_and_versioned() {
        let registry = SchemaRegistry::v1();
        let names: Vec<_> = registry.events().iter().map(|s| s.name).collect();
        for (i, name) in names.iter().enumerate() {
            assert!(name.starts_with("v1."), "{name} is not versioned");
            assert!(!names[i + 1..].contains(name), "{name} registered twice");
        }
    }

    #[test]
    fn valid_payload_passes() {
        SchemaRegistry::v1()
            .validate(NOTE_CREATED, &note_created())
            .unwrap();
    }

    #[test]
    fn empty_title_is_rejected() {
        let mut payload = note_created();
        payload["title"] = json!("");

        let err = SchemaRegistry::v1()
            .validate(NOTE_CREATED, &payload)
            .unwrap_err();
        assert_eq!(
            err.violations(),
            [Violation::new("title", ViolationKind::TooShort { min: 1 })]
        );
    }

    #[test]
    fn title_length_counts_characters_not_bytes() {
        let mut payload = note_created();
        payload["title"] = json!("é".repeat(TITLE_MAX_LEN));
        SchemaRegistry::v1()
            .validate(NOTE_CREATED, &payload)
            .unwrap();

        payload["title"] = json!("é".repeat(TITLE_MAX_LEN + 1));
        let err = SchemaRegistry::v1()
            .validate(NOTE_CREATED, &payload)
            .unwrap_err();
        assert!(err.rejects_field("title"));
    }

    #[test]
    fn enum_outside_closed_set_is_rejected() {
        let mut payload = note_created();
        payload["type"] = json!("villain");

        let err = SchemaRegistry::v1()
            .validate(NOTE_CREATED, &payload)
            .unwrap_err();
        assert!(matches!(
            err.violations()[0].kind,
            ViolationKind::NotInSet { .. }
        ));
    }

    #[test]
    fn collects_all_violations() {
        let mut payload = note_created();
        payload["pageNumber"] = json!(0);
        payload["bookId"] = json!("not-a-uuid");
        payload.as_object_mut().unwrap().remove("createdAt");
        payload["color"] = json!("red");

        let err = SchemaRegistry::v1()
            .validate(NOTE_CREATED, &payload)
            .unwrap_err();
        assert!(err.rejects_field("pageNumber"));
        assert!(err.rejects_field("bookId"));
        assert!(err.rejects_field("createdAt"));
        assert!(err.rejects_field("color"));
        assert_eq!(err.violations().len(), 4);
    }

    #[test]
    fn nullable_field_must_be_present() {
        let mut payload = note_created();
        payload.as_object_mut().unwrap().remove("content");

        let err = SchemaRegistry::v1()
            .validate(NOTE_CREATED, &payload)
            .unwrap_err();
        assert_eq!(
            err.violations(),
            [Violation::new("content", ViolationKind::Missing)]
        );
    }

    #[test]
    fn patch_fields_may_be_absent_or_null() {
        let registry = SchemaRegistry::v1();
        let id = "6c5f1a3e-3c1b-4d0e-9a57-1f7c1c0b9f11";

        registry
            .validate(NOTE_UPDATED, &json!({ "id": id, "updatedAt": 5 }))
            .unwrap();
        registry
            .validate(
                NOTE_UPDATED,
                &json!({ "id": id, "content": null, "updatedAt": 5 }),
            )
            .unwrap();

        let err = registry
            .validate(
                NOTE_UPDATED,
                &json!({ "id": id, "title": null, "updatedAt": 5 }),
            )
            .unwrap_err();
        assert_eq!(
            err.violations(),
            [Violation::new("title", ViolationKind::Null)]
        );
    }

    #[test]
    fn unknown_event_is_rejected() {
        let err = SchemaRegistry::v1()
            .validate("v1.ChapterCreated", &json!({}))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownEvent("v1.ChapterCreated".to_string())
        );
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let err = SchemaRegistry::v1()
            .validate(BOOK_DELETED, &json!([1, 2]))
            .unwrap_err();
        assert!(err.rejects_field("payload"));
    }

    #[test]
    fn fractional_page_is_rejected() {
        let mut payload = note_created();
        payload["pageNumber"] = json!(1.5);

        let err = SchemaRegistry::v1()
            .validate(NOTE_CREATED, &payload)
            .unwrap_err();
        assert_eq!(
            err.violations()[0].kind,
            ViolationKind::WrongType {
                expected: "an integer"
            }
        );
    }
}
