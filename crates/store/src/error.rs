//! Store error types.

use common::NoteId;
use domain::{EntityRef, ValidationError};
use event_log::EventLogError;
use projections::ProjectionError;
use thiserror::Error;

use crate::cascade::CascadeFailure;

/// Why a relationship between two notes was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRelationship {
    /// Both endpoints are the same note.
    #[error("note {0} cannot be related to itself")]
    SelfReference(NoteId),

    /// The endpoints belong to different books.
    #[error("notes {from} and {to} belong to different books")]
    CrossBook { from: NoteId, to: NoteId },
}

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The event payload violates its schema. Nothing was committed.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A referenced entity does not exist or is soft-deleted.
    #[error("{0} not found")]
    NotFound(EntityRef),

    /// A relationship's endpoints are not a valid pair.
    #[error("Invalid relationship: {0}")]
    InvalidRelationship(#[from] InvalidRelationship),

    /// A cascade delete stopped part way.
    #[error(transparent)]
    Cascade(#[from] CascadeFailure),

    /// The event cannot apply to the current tables. Nothing was committed.
    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),

    /// An error occurred in the event log.
    #[error("Event log error: {0}")]
    EventLog(#[from] EventLogError),

    /// Failed to serialize an event payload.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store has been closed.
    #[error("Store is closed")]
    Closed,

    /// The commit task was cancelled before it produced a result, which
    /// only happens when the runtime shuts down mid-commit.
    #[error("Commit interrupted")]
    Interrupted,
}

impl StoreError {
    /// A short, stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Validation(_) => "validation",
            StoreError::NotFound(_) => "not_found",
            StoreError::InvalidRelationship(_) => "invalid_relationship",
            StoreError::Cascade(_) => "cascade",
            StoreError::Projection(_) => "projection",
            StoreError::EventLog(_) => "event_log",
            StoreError::Serialization(_) => "serialization",
            StoreError::Closed => "closed",
            StoreError::Interrupted => "interrupted",
        }
    }
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;
