use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::DateTime;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::{
    EventEnvelope, EventId, EventLogError, EventQuery, Result, Sequence,
    log::{EventLog, EventStream},
};

const SELECT_COLUMNS: &str = "SELECT sequence, id, event_type, recorded_at, payload FROM events";

/// SQLite-backed event log.
///
/// Appends run in their own transaction and return only after it commits,
/// so a successful [`append`](EventLog::append) is durable.
#[derive(Clone)]
pub struct SqliteEventLog {
    pool: SqlitePool,
}

impl SqliteEventLog {
    /// Opens (creating if needed) the log stored in the database file at `path`
    /// and applies pending migrations.
    #[tracing::instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        let log = Self::new(pool);
        log.run_migrations().await?;
        tracing::info!("sqlite event log opened");
        Ok(log)
    }

    /// Opens a private in-memory database. Nothing is persisted.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // A second connection would see a different, empty database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let log = Self::new(pool);
        log.run_migrations().await?;
        Ok(log)
    }

    /// Wraps an existing pool. Migrations are not run.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    fn row_to_event(row: SqliteRow) -> Result<EventEnvelope> {
        let sequence: i64 = row.try_get("sequence")?;
        let corrupt = |reason: String| EventLogError::Corrupt { sequence, reason };

        let id: String = row.try_get("id")?;
        let event_id = EventId::parse(&id).map_err(|e| corrupt(e.to_string()))?;
        let recorded_at_ms: i64 = row.try_get("recorded_at")?;
        let recorded_at = DateTime::from_timestamp_millis(recorded_at_ms)
            .ok_or_else(|| corrupt(format!("timestamp {recorded_at_ms} out of range")))?;
        let payload: String = row.try_get("payload")?;

        Ok(EventEnvelope {
            event_id,
            sequence: Sequence::new(sequence as u64),
            event_type: row.try_get("event_type")?,
            recorded_at,
            payload: serde_json::from_str(&payload)?,
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.pool.is_closed() {
            return Err(EventLogError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl EventLog for SqliteEventLog {
    async fn append(&self, event: EventEnvelope) -> Result<Sequence> {
        self.ensure_open()?;
        let payload = serde_json::to_string(&event.payload)?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO events (id, event_type, recorded_at, payload)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(event.event_id.to_string())
        .bind(&event.event_type)
        .bind(event.recorded_at.timestamp_millis())
        .bind(payload)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return EventLogError::DuplicateEvent(event.event_id);
            }
            EventLogError::Database(e)
        })?;

        tx.commit().await?;
        metrics::counter!("event_log_appends_total").increment(1);

        Ok(Sequence::new(result.last_insert_rowid() as u64))
    }

    async fn replay_all(&self) -> Result<Vec<EventEnvelope>> {
        self.ensure_open()?;
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY sequence ASC"))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn stream_all(&self) -> Result<EventStream> {
        use futures_util::stream;

        let events = self.replay_all().await?;
        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }

    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventEnvelope>> {
        self.ensure_open()?;
        let mut sql = format!("{SELECT_COLUMNS} WHERE 1=1");

        if let Some(ref types) = query.event_types {
            if types.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders = vec!["?"; types.len()].join(", ");
            sql.push_str(&format!(" AND event_type IN ({placeholders})"));
        }
        if query.from_sequence.is_some() {
            sql.push_str(" AND sequence >= ?");
        }
        if query.to_sequence.is_some() {
            sql.push_str(" AND sequence <= ?");
        }

        sql.push_str(" ORDER BY sequence ASC");

        // SQLite requires a LIMIT clause before OFFSET; -1 means unbounded.
        if query.limit.is_some() || query.offset.is_some() {
            sql.push_str(" LIMIT ? OFFSET ?");
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(ref types) = query.event_types {
            for event_type in types {
                sqlx_query = sqlx_query.bind(event_type.clone());
            }
        }
        if let Some(from) = query.from_sequence {
            sqlx_query = sqlx_query.bind(from.as_u64() as i64);
        }
        if let Some(to) = query.to_sequence {
            sqlx_query = sqlx_query.bind(to.as_u64() as i64);
        }
        if query.limit.is_some() || query.offset.is_some() {
            let limit = query.limit.map(|l| l as i64).unwrap_or(-1);
            let offset = query.offset.unwrap_or(0) as i64;
            sqlx_query = sqlx_query.bind(limit).bind(offset);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn get_event(&self, event_id: EventId) -> Result<Option<EventEnvelope>> {
        self.ensure_open()?;
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
            .bind(event_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_event).transpose()
    }

    async fn last_sequence(&self) -> Result<Sequence> {
        self.ensure_open()?;
        let last: Option<i64> = sqlx::query_scalar("SELECT MAX(sequence) FROM events")
            .fetch_one(&self.pool)
            .await?;

        Ok(Sequence::new(last.unwrap_or(0) as u64))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        tracing::info!("sqlite event log closed");
        Ok(())
    }
}
