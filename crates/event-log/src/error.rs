use thiserror::Error;

use crate::EventId;

/// Errors that can occur when interacting with the event log.
#[derive(Debug, Error)]
pub enum EventLogError {
    /// An event with the same ID was already appended.
    #[error("Event {0} has already been appended")]
    DuplicateEvent(EventId),

    /// The log has been closed and accepts no further operations.
    #[error("Event log is closed")]
    Closed,

    /// A stored row could not be decoded back into an envelope.
    #[error("Corrupt event row at sequence {sequence}: {reason}")]
    Corrupt { sequence: i64, reason: String },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for event log operations.
pub type Result<T> = std::result::Result<T, EventLogError>;
