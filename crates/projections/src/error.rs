//! Projection error types.

use domain::{EntityRef, ValidationError};
use event_log::{EventLogError, Sequence};
use thiserror::Error;

/// Errors that can occur while materializing events into read tables.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// An error occurred in the event log.
    #[error("Event log error: {0}")]
    EventLog(#[from] EventLogError),

    /// A stored event no longer decodes against its schema.
    #[error("Event at sequence {sequence} is invalid: {source}")]
    InvalidEvent {
        sequence: Sequence,
        #[source]
        source: ValidationError,
    },

    /// An insert targeted a primary key that is already taken.
    #[error("{0} already exists")]
    DuplicateKey(EntityRef),

    /// An update or delete targeted a row that was never inserted.
    #[error("{0} does not exist")]
    MissingRow(EntityRef),

    /// An update or delete targeted a soft-deleted row.
    #[error("{0} is deleted")]
    RowDeleted(EntityRef),
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
