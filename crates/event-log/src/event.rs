use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::EventId;

/// Position of an event in the log.
///
/// Sequences start at 1 for the first appended event and increase by 1 for
/// each subsequent append. Replay order is sequence order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Sequence(u64);

impl Sequence {
    /// Creates a sequence from a raw value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// The position before any event has been appended.
    pub fn initial() -> Self {
        Self(0)
    }

    /// The position of the first appended event.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next position.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw sequence value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Sequence {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// An immutable record in the event log.
///
/// The payload is stored as opaque JSON; the log does not interpret it.
/// `recorded_at` is bookkeeping only and must never feed materialization,
/// since replay has to reproduce identical state regardless of wall time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique identifier for this event.
    pub event_id: EventId,

    /// Position in the log. Unassigned (zero) until the envelope is appended.
    pub sequence: Sequence,

    /// Versioned event name (e.g. `v1.BookCreated`).
    pub event_type: String,

    /// When the log accepted the event.
    pub recorded_at: DateTime<Utc>,

    /// The event payload as JSON.
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Creates a new event envelope builder.
    pub fn builder() -> EventEnvelopeBuilder {
        EventEnvelopeBuilder::default()
    }

    /// Returns a copy of this envelope positioned at `sequence`.
    pub fn with_sequence(mut self, sequence: Sequence) -> Self {
        self.sequence = sequence;
        self
    }
}

/// Builder for constructing event envelopes.
#[derive(Debug, Default)]
pub struct EventEnvelopeBuilder {
    event_id: Option<EventId>,
    event_type: Option<String>,
    recorded_at: Option<DateTime<Utc>>,
    payload: Option<serde_json::Value>,
}

impl EventEnvelopeBuilder {
    /// Sets the event ID. If not set, a new ID will be generated.
    pub fn event_id(mut self, id: EventId) -> Self {
        self.event_id = Some(id);
        self
    }

    /// Sets the event type.
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Sets the record time. If not set, the current time will be used.
    pub fn recorded_at(mut self, recorded_at: DateTime<Utc>) -> Self {
        self.recorded_at = Some(recorded_at);
        self
    }

    /// Sets the payload from a serializable value.
    pub fn payload<T: Serialize>(mut self, payload: &T) -> Result<Self, serde_json::Error> {
        self.payload = Some(serde_json::to_value(payload)?);
        Ok(self)
    }

    /// Sets the payload from a raw JSON value.
    pub fn payload_raw(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Builds the event envelope, returning None if the event type or payload
    /// is missing.
    pub fn try_build(self) -> Option<EventEnvelope> {
        Some(EventEnvelope {
            event_id: self.event_id.unwrap_or_default(),
            sequence: Sequence::initial(),
            event_type: self.event_type?,
            recorded_at: self.recorded_at.unwrap_or_else(Utc::now),
            payload: self.payload?,
        })
    }

    /// Builds the event envelope.
    ///
    /// # Panics
    ///
    /// Panics if the event type or payload is not set.
    pub fn build(self) -> EventEnvelope {
        self.try_build()
            .expect("event_type and payload are required")
    }
}
