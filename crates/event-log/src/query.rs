use crate::{EventEnvelope, Sequence};

/// Builder for constructing event log queries.
///
/// Allows filtering events by type and by sequence range, with paging.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    /// Filter by event types (any of these types).
    pub event_types: Option<Vec<String>>,

    /// Filter by minimum sequence (inclusive).
    pub from_sequence: Option<Sequence>,

    /// Filter by maximum sequence (inclusive).
    pub to_sequence: Option<Sequence>,

    /// Maximum number of events to return.
    pub limit: Option<usize>,

    /// Number of events to skip.
    pub offset: Option<usize>,
}

impl EventQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for events of a specific type.
    pub fn for_event_type(event_type: impl Into<String>) -> Self {
        Self {
            event_types: Some(vec![event_type.into()]),
            ..Default::default()
        }
    }

    /// Filters by event type.
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_types = Some(vec![event_type.into()]);
        self
    }

    /// Filters by multiple event types (any of these).
    pub fn event_types(mut self, event_types: Vec<String>) -> Self {
        self.event_types = Some(event_types);
        self
    }

    /// Filters to events starting from this sequence (inclusive).
    pub fn from_sequence(mut self, sequence: Sequence) -> Self {
        self.from_sequence = Some(sequence);
        self
    }

    /// Filters to events up to this sequence (inclusive).
    pub fn to_sequence(mut self, sequence: Sequence) -> Self {
        self.to_sequence = Some(sequence);
        self
    }

    /// Limits the number of events returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips this many events before returning results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if the envelope passes every filter (paging excluded).
    pub fn matches(&self, envelope: &EventEnvelope) -> bool {
        if let Some(ref types) = self.event_types
            && !types.contains(&envelope.event_type)
        {
            return false;
        }
        if let Some(from) = self.from_sequence
            && envelope.sequence < from
        {
            return false;
        }
        if let Some(to) = self.to_sequence
            && envelope.sequence > to
        {
            return false;
        }
        true
    }
}
