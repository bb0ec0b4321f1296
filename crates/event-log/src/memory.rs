use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    EventEnvelope, EventId, EventLogError, EventQuery, Result, Sequence,
    log::{EventLog, EventStream},
};

/// In-memory event log implementation.
///
/// Backs ephemeral stores and tests. It provides the same ordering and
/// immutability guarantees as [`SqliteEventLog`](crate::SqliteEventLog) but
/// nothing survives the process.
#[derive(Clone, Default)]
pub struct InMemoryEventLog {
    events: Arc<RwLock<Vec<EventEnvelope>>>,
    closed: Arc<AtomicBool>,
}

impl InMemoryEventLog {
    /// Creates a new empty in-memory event log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(EventLogError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn append(&self, event: EventEnvelope) -> Result<Sequence> {
        self.ensure_open()?;
        let mut events = self.events.write().await;

        if events.iter().any(|e| e.event_id == event.event_id) {
            return Err(EventLogError::DuplicateEvent(event.event_id));
        }

        let sequence = Sequence::new(events.len() as u64 + 1);
        events.push(event.with_sequence(sequence));
        metrics::counter!("event_log_appends_total").increment(1);
        Ok(sequence)
    }

    async fn replay_all(&self) -> Result<Vec<EventEnvelope>> {
        self.ensure_open()?;
        Ok(self.events.read().await.clone())
    }

    async fn stream_all(&self) -> Result<EventStream> {
        use futures_util::stream;

        let events = self.replay_all().await?;
        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }

    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventEnvelope>> {
        self.ensure_open()?;
        let events = self.events.read().await;
        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);

        Ok(events
            .iter()
            .filter(|e| query.matches(e))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_event(&self, event_id: EventId) -> Result<Option<EventEnvelope>> {
        self.ensure_open()?;
        let events = self.events.read().await;
        Ok(events.iter().find(|e| e.event_id == event_id).cloned())
    }

    async fn last_sequence(&self) -> Result<Sequence> {
        self.ensure_open()?;
        Ok(Sequence::new(self.events.read().await.len() as u64))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventLogExt;

    fn create_test_event(event_type: &str) -> EventEnvelope {
        EventEnvelope::builder()
            .event_type(event_type)
            .payload_raw(serde_json::json!({"test": true}))
            .build()
    }

    #[tokio::test]
    async fn append_assigns_consecutive_sequences() {
        let log = InMemoryEventLog::new();

        let s1 = log.append(create_test_event("Event1")).await.unwrap();
        let s2 = log.append(create_test_event("Event2")).await.unwrap();

        assert_eq!(s1, Sequence::first());
        assert_eq!(s2, Sequence::new(2));
        assert_eq!(log.len().await, 2);
    }

    #[tokio::test]
    async fn replay_returns_append_order() {
        let log = InMemoryEventLog::new();
        for name in ["A", "B", "C"] {
            log.append(create_test_event(name)).await.unwrap();
        }

        let replayed = log.replay_all().await.unwrap();
        let names: Vec<_> = replayed.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(names, ["A", "B", "C"]);
        assert_eq!(replayed[2].sequence, Sequence::new(3));
    }

    #[tokio::test]
    async fn duplicate_event_id_is_rejected() {
        let log = InMemoryEventLog::new();
        let event = create_test_event("Event1");

        log.append(event.clone()).await.unwrap();
        let result = log.append(event).await;

        assert!(matches!(result, Err(EventLogError::DuplicateEvent(_))));
        assert_eq!(log.len().await, 1);
    }

    #[tokio::test]
    async fn query_events_with_filters_and_paging() {
        let log = InMemoryEventLog::new();
        for name in ["A", "B", "A", "A"] {
            log.append(create_test_event(name)).await.unwrap();
        }

        let all_a = log.get_events_by_type("A").await.unwrap();
        assert_eq!(all_a.len(), 3);

        let paged = log
            .query_events(EventQuery::for_event_type("A").offset(1).limit(1))
            .await
            .unwrap();
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0].sequence, Sequence::new(3));
    }

    #[tokio::test]
    async fn get_event_by_id() {
        let log = InMemoryEventLog::new();
        let event = create_test_event("Event1");
        let id = event.event_id;
        log.append(event).await.unwrap();

        let found = log.get_event(id).await.unwrap().unwrap();
        assert_eq!(found.sequence, Sequence::first());
        assert!(log.get_event(EventId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stream_all_events() {
        use futures_util::StreamExt;

        let log = InMemoryEventLog::new();
        log.append(create_test_event("Event1")).await.unwrap();
        log.append(create_test_event("Event2")).await.unwrap();

        let stream = log.stream_all().await.unwrap();
        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn closed_log_rejects_operations() {
        let log = InMemoryEventLog::new();
        assert!(log.is_empty().await.unwrap());
        log.close().await.unwrap();

        let result = log.append(create_test_event("Event1")).await;
        assert!(matches!(result, Err(EventLogError::Closed)));
        assert!(matches!(log.replay_all().await, Err(EventLogError::Closed)));
    }
}
