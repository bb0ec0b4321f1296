//! Projection processor for feeding logged events into the read tables.

use std::sync::Arc;

use domain::LibraryEvent;
use event_log::{EventEnvelope, EventLog};
use futures_util::StreamExt;

use crate::{ProjectionError, ReadTables, Result};

/// Replays events from an event log into [`ReadTables`].
///
/// The processor supports:
/// - Catch-up: applies every logged event past the tables' position
/// - Rebuild: materializes fresh tables from the whole log
pub struct ProjectionProcessor<L: EventLog + ?Sized> {
    log: Arc<L>,
}

impl<L: EventLog + ?Sized> ProjectionProcessor<L> {
    /// Creates a new processor reading from `log`.
    pub fn new(log: Arc<L>) -> Self {
        Self { log }
    }

    /// Decodes a logged envelope back into a typed event.
    pub fn decode(envelope: EventEnvelope) -> Result<LibraryEvent> {
        let sequence = envelope.sequence;
        LibraryEvent::from_parts(&envelope.event_type, envelope.payload)
            .map_err(|source| ProjectionError::InvalidEvent { sequence, source })
    }

    /// Applies every event the tables have not yet seen, in log order, and
    /// returns how many were applied.
    #[tracing::instrument(skip(self, tables), fields(from = %tables.position()))]
    pub async fn run_catch_up(&self, tables: &mut ReadTables) -> Result<u64> {
        let mut stream = self.log.stream_all().await?;
        let mut applied: u64 = 0;

        while let Some(result) = stream.next().await {
            let envelope = result?;
            if envelope.sequence <= tables.position() {
                continue;
            }

            let sequence = envelope.sequence;
            let event = Self::decode(envelope)?;
            tables.apply_event(&event)?;
            tables.advance_to(sequence);
            applied += 1;
        }

        tracing::info!(events_applied = applied, position = %tables.position(), "catch-up complete");

        Ok(applied)
    }

    /// Builds fresh tables by replaying the whole log from empty.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild(&self) -> Result<ReadTables> {
        let mut tables = ReadTables::new();
        self.run_catch_up(&mut tables).await?;
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use common::BookId;
    use domain::{BookCreatedData, BookDeletedData, DomainEvent};
    use event_log::{InMemoryEventLog, Sequence};

    fn envelope(event: &LibraryEvent) -> EventEnvelope {
        EventEnvelope::builder()
            .event_type(event.event_type())
            .payload_raw(event.payload().unwrap())
            .build()
    }

    fn book_created(title: &str) -> LibraryEvent {
        LibraryEvent::BookCreated(BookCreatedData {
            id: BookId::new(),
            title: title.to_string(),
            author: None,
            created_at: DateTime::from_timestamp_millis(1).unwrap(),
        })
    }

    #[tokio::test]
    async fn catch_up_applies_all_events() {
        let log = Arc::new(InMemoryEventLog::new());
        for title in ["Dune", "Emma", "Beloved"] {
            log.append(envelope(&book_created(title))).await.unwrap();
        }

        let processor = ProjectionProcessor::new(log);
        let mut tables = ReadTables::new();
        let applied = processor.run_catch_up(&mut tables).await.unwrap();

        assert_eq!(applied, 3);
        assert_eq!(tables.books().len(), 3);
        assert_eq!(tables.position(), Sequence::new(3));
    }

    #[tokio::test]
    async fn catch_up_skips_already_applied() {
        let log = Arc::new(InMemoryEventLog::new());
        log.append(envelope(&book_created("Dune"))).await.unwrap();

        let processor = ProjectionProcessor::new(Arc::clone(&log));
        let mut tables = ReadTables::new();
        processor.run_catch_up(&mut tables).await.unwrap();

        log.append(envelope(&book_created("Emma"))).await.unwrap();
        let applied = processor.run_catch_up(&mut tables).await.unwrap();

        assert_eq!(applied, 1);
        assert_eq!(tables.books().len(), 2);
    }

    #[tokio::test]
    async fn rebuild_is_deterministic() {
        let log = Arc::new(InMemoryEventLog::new());
        let created = book_created("Dune");
        let id = match &created {
            LibraryEvent::BookCreated(data) => data.id,
            _ => unreachable!(),
        };
        log.append(envelope(&created)).await.unwrap();
        log.append(envelope(&LibraryEvent::BookDeleted(BookDeletedData {
            id,
            deleted_at: DateTime::from_timestamp_millis(9).unwrap(),
        })))
        .await
        .unwrap();

        let processor = ProjectionProcessor::new(log);
        let first = processor.rebuild().await.unwrap();
        let second = processor.rebuild().await.unwrap();

        assert_eq!(first, second);
        assert!(first.books().get(id).unwrap().deleted_at.is_some());
    }

    #[tokio::test]
    async fn empty_log_rebuilds_empty_tables() {
        let processor = ProjectionProcessor::new(Arc::new(InMemoryEventLog::new()));
        let tables = processor.rebuild().await.unwrap();
        assert_eq!(tables, ReadTables::new());
    }

    #[tokio::test]
    async fn invalid_stored_event_reports_its_sequence() {
        let log = Arc::new(InMemoryEventLog::new());
        log.append(
            EventEnvelope::builder()
                .event_type("v1.BookCreated")
                .payload_raw(serde_json::json!({ "title": "" }))
                .build(),
        )
        .await
        .unwrap();

        let processor = ProjectionProcessor::new(log);
        let err = processor.rebuild().await.unwrap_err();
        assert!(matches!(
            err,
            ProjectionError::InvalidEvent { sequence, .. } if sequence == Sequence::first()
        ));
    }
}
