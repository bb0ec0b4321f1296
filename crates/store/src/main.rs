//! Opens a store, replays its log and reports what it holds.

use domain::TableName;
use store::{Store, StoreConfig};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() {
    let config = StoreConfig::from_env();

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(db_path = %config.db_path.display(), "opening store");
    let store = Store::open_with_config(&config)
        .await
        .expect("failed to open store");

    let counts = store
        .read(|tables| {
            TableName::ALL
                .iter()
                .map(|&table| (table, tables.live_count(table), tables.row_count(table)))
                .collect::<Vec<_>>()
        })
        .await;
    for (table, live, total) in counts {
        tracing::info!(%table, live, deleted = total - live, "table");
    }

    for book in store.list_books().await {
        match store.book_view(book.id, None).await {
            Ok(view) => tracing::info!(
                book_id = %book.id,
                title = %book.title,
                notes = view.notes.len(),
                relationships = view.relationships.len(),
                max_page = ?view.max_page,
                current_page = ?book.current_page,
                "book"
            ),
            Err(e) => tracing::warn!(book_id = %book.id, error = %e, "failed to read book"),
        }
    }

    store.close().await.expect("failed to close store");
}
