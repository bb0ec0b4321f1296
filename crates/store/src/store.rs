//! The store handle: command/commit API and query surface.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use domain::{DomainEvent, LibraryEvent, SchemaRegistry, TableName};
use event_log::{EventEnvelope, EventId, EventLog, InMemoryEventLog, Sequence, SqliteEventLog};
use projections::{LiveQueries, LiveQuery, ProjectionProcessor, Query, ReadTables, Row, materialize};
use tokio::sync::{Mutex, RwLock};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};

struct Inner {
    log: Arc<dyn EventLog>,
    registry: SchemaRegistry,
    tables: RwLock<ReadTables>,
    live: Mutex<LiveQueries>,
    /// Serializes commits so no two interleave validate, append and apply.
    writer: Mutex<()>,
    closed: AtomicBool,
}

/// Handle to an open store.
///
/// The event log is the source of truth; the read tables are rebuilt from it
/// on open. Every change goes through [`commit`](Self::commit), one at a time.
/// Handles are cheap to clone and share one underlying store.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Opens the store persisted in the SQLite file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(&StoreConfig::default().with_db_path(path.as_ref())).await
    }

    /// Opens the store described by `config`.
    pub async fn open_with_config(config: &StoreConfig) -> Result<Self> {
        let log = SqliteEventLog::open(&config.db_path, config.max_connections).await?;
        Self::with_log(Arc::new(log)).await
    }

    /// Opens an ephemeral store. Nothing outlives the handle.
    pub async fn in_memory() -> Result<Self> {
        Self::with_log(Arc::new(InMemoryEventLog::new())).await
    }

    /// Opens a store over an existing event log, replaying it into fresh tables.
    #[tracing::instrument(skip(log))]
    pub async fn with_log(log: Arc<dyn EventLog>) -> Result<Self> {
        let tables = ProjectionProcessor::new(Arc::clone(&log)).rebuild().await?;

        tracing::info!(
            position = %tables.position(),
            books = tables.live_count(TableName::Books),
            notes = tables.live_count(TableName::Notes),
            relationships = tables.live_count(TableName::NoteRelationships),
            "store opened"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                log,
                registry: SchemaRegistry::v1(),
                tables: RwLock::new(tables),
                live: Mutex::new(LiveQueries::new()),
                writer: Mutex::new(()),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Closes the store. Later commits fail with [`StoreError::Closed`];
    /// reads keep serving the last committed state.
    #[tracing::instrument(skip(self))]
    pub async fn close(&self) -> Result<()> {
        let _writer = self.inner.writer.lock().await;
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.inner.log.close().await?;
        tracing::info!("store closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    /// The underlying event log.
    pub fn log(&self) -> &Arc<dyn EventLog> {
        &self.inner.log
    }

    /// The schema registry commits are validated against.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.inner.registry
    }

    /// Validates, appends and materializes one event.
    ///
    /// Either the event is in the log and its effect is visible to every
    /// later query, or the call fails and neither the log nor the tables
    /// changed. Live queries on the touched table are refreshed once before
    /// this returns.
    #[tracing::instrument(skip(self, event), fields(event_type = event.event_type(), target = %event.target()))]
    pub async fn commit(&self, event: LibraryEvent) -> Result<EventId> {
        let start = Instant::now();
        let result = self.commit_inner(&event).await;

        match &result {
            Ok(event_id) => {
                metrics::counter!("store_commits_total", "event_type" => event.event_type())
                    .increment(1);
                tracing::debug!(%event_id, "event committed");
            }
            Err(e) => {
                metrics::counter!("store_commit_rejections_total", "reason" => e.kind())
                    .increment(1);
                tracing::debug!(error = %e, "commit rejected");
            }
        }
        metrics::histogram!("store_commit_duration_seconds").record(start.elapsed().as_secs_f64());

        result
    }

    /// Commits an untyped event, validating `payload` against the schema
    /// registered under `event_type` first.
    pub async fn commit_raw(
        &self,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<EventId> {
        self.ensure_open()?;
        let event = match LibraryEvent::from_parts(event_type, payload) {
            Ok(event) => event,
            Err(e) => {
                metrics::counter!("store_commit_rejections_total", "reason" => "validation")
                    .increment(1);
                return Err(e.into());
            }
        };
        self.commit(event).await
    }

    async fn commit_inner(&self, event: &LibraryEvent) -> Result<EventId> {
        self.ensure_open()?;

        let payload = event.payload()?;
        self.inner.registry.validate(event.event_type(), &payload)?;
        // Apply the logged form so replay reproduces these rows exactly;
        // timestamps are persisted at millisecond precision.
        let logged = LibraryEvent::from_parts(event.event_type(), payload.clone())?;

        // Once appended, an event must reach the tables. The locked section
        // runs on its own task so it completes even if this future is dropped.
        let store = self.clone();
        let task = tokio::spawn(async move { store.commit_locked(logged, payload).await });
        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(StoreError::Interrupted),
        }
    }

    async fn commit_locked(
        &self,
        logged: LibraryEvent,
        payload: serde_json::Value,
    ) -> Result<EventId> {
        let _writer = self.inner.writer.lock().await;
        self.ensure_open()?;

        // Dry run: the mutation must apply before anything is appended.
        let mutation = {
            let tables = self.inner.tables.read().await;
            materialize(&logged, &tables)?
        };

        let envelope = EventEnvelope::builder()
            .event_type(logged.event_type())
            .payload_raw(payload)
            .build();
        let event_id = envelope.event_id;
        let sequence = self.inner.log.append(envelope).await?;

        let table = {
            let mut tables = self.inner.tables.write().await;
            let table = tables.apply(mutation)?;
            tables.advance_to(sequence);
            table
        };

        self.notify(&BTreeSet::from([table])).await;
        Ok(event_id)
    }

    async fn notify(&self, touched: &BTreeSet<TableName>) {
        let mut live = self.inner.live.lock().await;
        let tables = self.inner.tables.read().await;
        live.notify(touched, &tables);
    }

    /// Runs `query` against the current tables.
    pub async fn query<R: Row>(&self, query: Query<R>) -> Vec<R> {
        query.run(&*self.inner.tables.read().await)
    }

    /// Runs `query` and returns its first row.
    pub async fn first<R: Row>(&self, query: Query<R>) -> Option<R> {
        query.first(&*self.inner.tables.read().await)
    }

    /// Runs `f` against one consistent view of all tables.
    pub async fn read<T>(&self, f: impl FnOnce(&ReadTables) -> T) -> T {
        f(&*self.inner.tables.read().await)
    }

    /// Subscribes to `query`. The returned handle holds the current result and
    /// receives a fresh one after every commit that touches the query's table.
    pub async fn subscribe<R: Row>(&self, query: Query<R>) -> LiveQuery<R> {
        let mut live = self.inner.live.lock().await;
        let tables = self.inner.tables.read().await;
        live.subscribe(query, &tables)
    }

    /// The sequence of the last event reflected in the tables.
    pub async fn position(&self) -> Sequence {
        self.inner.tables.read().await.position()
    }

    /// Drops the read tables and rebuilds them by replaying the whole log.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild(&self) -> Result<()> {
        let _writer = self.inner.writer.lock().await;
        self.ensure_open()?;

        let rebuilt = ProjectionProcessor::new(Arc::clone(&self.inner.log))
            .rebuild()
            .await?;
        *self.inner.tables.write().await = rebuilt;

        let mut live = self.inner.live.lock().await;
        let tables = self.inner.tables.read().await;
        live.notify_all(&tables);
        tracing::info!(position = %tables.position(), "read tables rebuilt");
        Ok(())
    }
}
