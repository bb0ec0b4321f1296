use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{EventEnvelope, EventId, EventQuery, Result, Sequence};

/// A stream of events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventEnvelope>> + Send>>;

/// Core trait for event log implementations.
///
/// A log is single-writer and strictly ordered: appends are assigned
/// consecutive [`Sequence`] numbers and reads return envelopes in that order.
/// Appended events are never modified or removed.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Durably appends an event and returns the sequence it was assigned.
    ///
    /// The envelope's own `sequence` field is ignored.
    async fn append(&self, event: EventEnvelope) -> Result<Sequence>;

    /// Returns every event in append order.
    async fn replay_all(&self) -> Result<Vec<EventEnvelope>>;

    /// Streams every event in append order.
    async fn stream_all(&self) -> Result<EventStream>;

    /// Retrieves events matching a query, in append order.
    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventEnvelope>>;

    /// Retrieves a single event by ID.
    async fn get_event(&self, event_id: EventId) -> Result<Option<EventEnvelope>>;

    /// Returns the sequence of the most recently appended event.
    ///
    /// Returns [`Sequence::initial`] for an empty log.
    async fn last_sequence(&self) -> Result<Sequence>;

    /// Releases any resources held by the log.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Extension trait providing convenience methods for event logs.
#[async_trait]
pub trait EventLogExt: EventLog {
    /// Returns the number of events in the log.
    async fn event_count(&self) -> Result<u64> {
        Ok(self.last_sequence().await?.as_u64())
    }

    /// Retrieves all events of a single type.
    async fn get_events_by_type(&self, event_type: &str) -> Result<Vec<EventEnvelope>> {
        self.query_events(EventQuery::for_event_type(event_type))
            .await
    }

    /// Returns true if the log holds no events.
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.last_sequence().await? == Sequence::initial())
    }
}

// Blanket implementation for all EventLog implementations
impl<T: EventLog + ?Sized> EventLogExt for T {}
