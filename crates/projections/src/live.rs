//! Live queries: query results that are re-sent after every commit touching
//! their table.

use std::collections::BTreeSet;

use domain::TableName;
use tokio::sync::watch;

use crate::ReadTables;
use crate::query::Query;
use crate::table::Row;

/// One published result set of a live query.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<R> {
    /// The rows matching the query.
    pub rows: Vec<R>,
    /// Number of refreshes since subscription; the initial result is 0.
    pub revision: u64,
}

/// The receiving end of a live query.
///
/// Dropping it unsubscribes; the registry prunes it at the next refresh.
#[derive(Debug)]
pub struct LiveQuery<R> {
    receiver: watch::Receiver<Snapshot<R>>,
}

impl<R: Clone> LiveQuery<R> {
    /// Returns the latest published snapshot.
    pub fn current(&self) -> Snapshot<R> {
        self.receiver.borrow().clone()
    }

    /// Returns the latest published rows.
    pub fn rows(&self) -> Vec<R> {
        self.receiver.borrow().rows.clone()
    }

    /// Returns true if a snapshot was published that has not been seen.
    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Waits for the next snapshot and marks it seen.
    ///
    /// Returns `None` once the store that owns the registry is gone.
    pub async fn changed(&mut self) -> Option<Snapshot<R>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}

struct Subscription {
    table: TableName,
    /// Re-runs the query and publishes; returns false once the receiver is gone.
    refresh: Box<dyn FnMut(&ReadTables) -> bool + Send + Sync>,
}

/// Registry of live queries, keyed by the table each one reads.
#[derive(Default)]
pub struct LiveQueries {
    subscriptions: Vec<Subscription>,
}

impl LiveQueries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `query`, publishing its current result immediately.
    pub fn subscribe<R: Row>(&mut self, query: Query<R>, tables: &ReadTables) -> LiveQuery<R> {
        let (sender, receiver) = watch::channel(Snapshot {
            rows: query.run(tables),
            revision: 0,
        });

        let mut revision = 0;
        self.subscriptions.push(Subscription {
            table: R::TABLE,
            refresh: Box::new(move |tables| {
                revision += 1;
                sender
                    .send(Snapshot {
                        rows: query.run(tables),
                        revision,
                    })
                    .is_ok()
            }),
        });

        LiveQuery { receiver }
    }

    /// Refreshes every subscription on one of `touched`, exactly once each,
    /// and drops subscriptions whose receiver has gone away.
    pub fn notify(&mut self, touched: &BTreeSet<TableName>, tables: &ReadTables) {
        if touched.is_empty() {
            return;
        }

        let before = self.subscriptions.len();
        self.subscriptions
            .retain_mut(|sub| !touched.contains(&sub.table) || (sub.refresh)(tables));

        let pruned = before - self.subscriptions.len();
        if pruned > 0 {
            tracing::debug!(pruned, "dropped closed live queries");
        }
    }

    /// Refreshes every subscription, e.g. after the tables were rebuilt.
    pub fn notify_all(&mut self, tables: &ReadTables) {
        let all: BTreeSet<_> = TableName::ALL.into_iter().collect();
        self.notify(&all, tables);
    }

    /// Number of registered subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl std::fmt::Debug for LiveQueries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveQueries")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use common::BookId;
    use domain::{Book, BookCreatedData, LibraryEvent, Note};

    fn add_book(tables: &mut ReadTables, title: &str) {
        tables
            .apply_event(&LibraryEvent::BookCreated(BookCreatedData {
                id: BookId::new(),
                title: title.to_string(),
                author: None,
                created_at: DateTime::from_timestamp_millis(1).unwrap(),
            }))
            .unwrap();
    }

    fn touched(tables: &[TableName]) -> BTreeSet<TableName> {
        tables.iter().copied().collect()
    }

    #[tokio::test]
    async fn publishes_initial_result() {
        let mut tables = ReadTables::new();
        add_book(&mut tables, "Dune");

        let mut registry = LiveQueries::new();
        let live = registry.subscribe(Query::<Book>::new(), &tables);

        let snapshot = live.current();
        assert_eq!(snapshot.revision, 0);
        assert_eq!(snapshot.rows.len(), 1);
        assert!(!live.has_changed());
    }

    #[tokio::test]
    async fn refreshes_once_per_notify() {
        let mut tables = ReadTables::new();
        let mut registry = LiveQueries::new();
        let mut live = registry.subscribe(Query::<Book>::new(), &tables);

        add_book(&mut tables, "Dune");
        registry.notify(&touched(&[TableName::Books]), &tables);

        let snapshot = live.changed().await.unwrap();
        assert_eq!(snapshot.revision, 1);
        assert_eq!(snapshot.rows[0].title, "Dune");
        assert!(!live.has_changed());
    }

    #[tokio::test]
    async fn other_tables_do_not_refresh() {
        let tables = ReadTables::new();
        let mut registry = LiveQueries::new();
        let live = registry.subscribe(Query::<Book>::new(), &tables);

        registry.notify(&touched(&[TableName::Notes]), &tables);

        assert!(!live.has_changed());
        assert_eq!(live.current().revision, 0);
    }

    #[tokio::test]
    async fn dropped_subscriptions_are_pruned() {
        let tables = ReadTables::new();
        let mut registry = LiveQueries::new();
        let kept = registry.subscribe(Query::<Note>::new(), &tables);
        let dropped = registry.subscribe(Query::<Note>::new(), &tables);
        assert_eq!(registry.len(), 2);

        drop(dropped);
        registry.notify_all(&tables);

        assert_eq!(registry.len(), 1);
        assert!(kept.has_changed());
    }
}
