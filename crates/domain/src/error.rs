//! Schema validation errors.

use thiserror::Error;

/// Why a single payload field was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    /// A required field is absent.
    Missing,
    /// A non-nullable field is `null`.
    Null,
    /// The field holds a JSON value of the wrong type.
    WrongType { expected: &'static str },
    /// A string is shorter than allowed.
    TooShort { min: usize },
    /// A string is longer than allowed.
    TooLong { max: usize },
    /// The value is outside a closed enum domain.
    NotInSet { allowed: &'static [&'static str] },
    /// An integer that must be positive is zero, negative or too large.
    NotPositive,
    /// An identifier is not a UUID.
    InvalidId,
    /// The field is not declared by the schema.
    Unknown,
    /// The payload decoded but could not be mapped onto the event type.
    Malformed(String),
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationKind::Missing => write!(f, "is required"),
            ViolationKind::Null => write!(f, "must not be null"),
            ViolationKind::WrongType { expected } => write!(f, "must be {expected}"),
            ViolationKind::TooShort { min: 1 } => write!(f, "must not be empty"),
            ViolationKind::TooShort { min } => write!(f, "must be at least {min} characters"),
            ViolationKind::TooLong { max } => write!(f, "must be at most {max} characters"),
            ViolationKind::NotInSet { allowed } => {
                write!(f, "must be one of: {}", allowed.join(", "))
            }
            ViolationKind::NotPositive => write!(f, "must be a positive integer"),
            ViolationKind::InvalidId => write!(f, "must be a UUID"),
            ViolationKind::Unknown => write!(f, "is not a known field"),
            ViolationKind::Malformed(reason) => write!(f, "is malformed: {reason}"),
        }
    }
}

/// A single rejected payload field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// The payload field name (`payload` when the whole payload is at fault).
    pub field: String,
    pub kind: ViolationKind,
}

impl Violation {
    pub fn new(field: impl Into<String>, kind: ViolationKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "`{}` {}", self.field, self.kind)
    }
}

/// A payload that does not conform to its declared event schema.
///
/// Validation errors are never retried: the commit that produced one had no
/// effect on the log or the read tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No schema is registered under the event name.
    #[error("Unknown event type `{0}`")]
    UnknownEvent(String),

    /// One or more payload fields violate the schema.
    #[error("Invalid `{event_type}` payload: {}", join_violations(.violations))]
    Payload {
        event_type: String,
        violations: Vec<Violation>,
    },
}

impl ValidationError {
    /// Returns the field violations, empty for an unknown event type.
    pub fn violations(&self) -> &[Violation] {
        match self {
            ValidationError::UnknownEvent(_) => &[],
            ValidationError::Payload { violations, .. } => violations,
        }
    }

    /// Returns true if `field` was rejected.
    pub fn rejects_field(&self, field: &str) -> bool {
        self.violations().iter().any(|v| v.field == field)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_error_lists_every_violation() {
        let err = ValidationError::Payload {
            event_type: "v1.NoteCreated".to_string(),
            violations: vec![
                Violation::new("title", ViolationKind::TooShort { min: 1 }),
                Violation::new("pageNumber", ViolationKind::NotPositive),
            ],
        };

        assert_eq!(
            err.to_string(),
            "Invalid `v1.NoteCreated` payload: `title` must not be empty; \
             `pageNumber` must be a positive integer"
        );
        assert!(err.rejects_field("title"));
        assert!(!err.rejects_field("bookId"));
    }

    #[test]
    fn unknown_event_has_no_violations() {
        let err = ValidationError::UnknownEvent("v2.BookCreated".to_string());
        assert!(err.violations().is_empty());
        assert_eq!(err.to_string(), "Unknown event type `v2.BookCreated`");
    }
}
