//! Settings singleton manager.
//!
//! Keeps one settings row holding the current background address. The row
//! is created lazily by the first write and updated in place afterwards.
//! The singleton is always "the row with the lowest id"; reads and writes
//! resolve it the same way.

use homeboard_core::{BACKGROUND_COLUMN, SETTINGS_ROW_ID, SettingsRecord, WriteStrategy};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::backend::{ID_COLUMN, Query, Row, SharedStore};
use crate::error::{StoreError, StoreResult};

#[derive(Clone)]
pub struct SettingsManager {
    store: SharedStore,
    table: String,
    strategy: WriteStrategy,
}

impl SettingsManager {
    pub fn new(store: SharedStore, table: impl Into<String>, strategy: WriteStrategy) -> Self {
        Self {
            store,
            table: table.into(),
            strategy,
        }
    }

    pub fn strategy(&self) -> WriteStrategy {
        self.strategy
    }

    /// The singleton row, if one exists.
    pub async fn current(&self) -> StoreResult<Option<SettingsRecord>> {
        let query = Query::new().columns(&[ID_COLUMN, BACKGROUND_COLUMN]).limit(1);
        let rows = self.store.select(&self.table, &query).await?;
        match rows.into_iter().next() {
            Some(row) => serde_json::from_value(Value::Object(row))
                .map(Some)
                .map_err(|e| StoreError::Deserialize(e.to_string())),
            None => Ok(None),
        }
    }

    /// Current background address; `None` when no row (or no address) exists.
    pub async fn try_get_background(&self) -> StoreResult<Option<String>> {
        Ok(self.current().await?.and_then(|record| record.background_url))
    }

    /// Current background address, or an empty string on absence or failure.
    pub async fn get_background(&self) -> String {
        match self.try_get_background().await {
            Ok(url) => url.unwrap_or_default(),
            Err(e) => {
                warn!(table = %self.table, error = %e, "failed to read background");
                String::new()
            }
        }
    }

    /// Point the singleton row at `url`, creating the row if needed.
    pub async fn set_background(&self, url: &str) -> StoreResult<()> {
        match self.strategy {
            WriteStrategy::CheckThenAct => self.check_then_act(url).await,
            WriteStrategy::Upsert => self.upsert(url).await,
        }
    }

    /// Lookup, then update or insert. Not atomic: a concurrent first write
    /// can slip in between the two steps and produce a second row.
    async fn check_then_act(&self, url: &str) -> StoreResult<()> {
        let mut patch = Row::new();
        patch.insert(BACKGROUND_COLUMN.to_string(), Value::from(url));

        match self.current().await? {
            Some(record) => {
                self.store.update(&self.table, record.id, patch).await?;
                debug!(table = %self.table, id = record.id, "background updated");
            }
            None => {
                self.store.insert(&self.table, vec![patch]).await?;
                info!(table = %self.table, "settings row created");
            }
        }
        Ok(())
    }

    async fn upsert(&self, url: &str) -> StoreResult<()> {
        let mut row = Row::new();
        row.insert(ID_COLUMN.to_string(), Value::from(SETTINGS_ROW_ID));
        row.insert(BACKGROUND_COLUMN.to_string(), Value::from(url));
        self.store.upsert(&self.table, row).await?;
        debug!(table = %self.table, id = SETTINGS_ROW_ID, "background upserted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tokio::sync::Barrier;

    use crate::backend::{Blob, BlobStore, RecordStore, StoreFuture};
    use crate::local::LocalStore;

    const TABLE: &str = "app_data";

    fn local() -> LocalStore {
        LocalStore::open_in_memory("http://localhost").unwrap()
    }

    fn manager(store: SharedStore, strategy: WriteStrategy) -> SettingsManager {
        SettingsManager::new(store, TABLE, strategy)
    }

    /// Holds every select until two callers have finished theirs, forcing
    /// the interleaving a real concurrent first write can hit.
    struct LockstepStore {
        inner: LocalStore,
        barrier: Barrier,
    }

    impl RecordStore for LockstepStore {
        fn select<'a>(&'a self, table: &'a str, query: &'a Query) -> StoreFuture<'a, Vec<Row>> {
            Box::pin(async move {
                let rows = self.inner.select(table, query).await?;
                self.barrier.wait().await;
                Ok(rows)
            })
        }

        fn insert<'a>(&'a self, table: &'a str, rows: Vec<Row>) -> StoreFuture<'a, ()> {
            self.inner.insert(table, rows)
        }

        fn update<'a>(&'a self, table: &'a str, id: i64, patch: Row) -> StoreFuture<'a, ()> {
            self.inner.update(table, id, patch)
        }

        fn upsert<'a>(&'a self, table: &'a str, row: Row) -> StoreFuture<'a, ()> {
            self.inner.upsert(table, row)
        }

        fn delete_all<'a>(&'a self, table: &'a str) -> StoreFuture<'a, ()> {
            self.inner.delete_all(table)
        }
    }

    impl BlobStore for LockstepStore {
        fn upload<'a>(&'a self, bucket: &'a str, name: &'a str, blob: Blob) -> StoreFuture<'a, ()> {
            self.inner.upload(bucket, name, blob)
        }

        fn public_url(&self, bucket: &str, name: &str) -> String {
            self.inner.public_url(bucket, name)
        }

        fn download<'a>(&'a self, bucket: &'a str, name: &'a str) -> StoreFuture<'a, Option<Blob>> {
            self.inner.download(bucket, name)
        }
    }

    /// A store whose every call fails.
    struct DownStore;

    impl RecordStore for DownStore {
        fn select<'a>(&'a self, _table: &'a str, _query: &'a Query) -> StoreFuture<'a, Vec<Row>> {
            Box::pin(async { Err(StoreError::Transport("connection refused".to_string())) })
        }

        fn insert<'a>(&'a self, _table: &'a str, _rows: Vec<Row>) -> StoreFuture<'a, ()> {
            Box::pin(async { Err(StoreError::Transport("connection refused".to_string())) })
        }

        fn update<'a>(&'a self, _table: &'a str, _id: i64, _patch: Row) -> StoreFuture<'a, ()> {
            Box::pin(async { Err(StoreError::Transport("connection refused".to_string())) })
        }

        fn upsert<'a>(&'a self, _table: &'a str, _row: Row) -> StoreFuture<'a, ()> {
            Box::pin(async { Err(StoreError::Transport("connection refused".to_string())) })
        }

        fn delete_all<'a>(&'a self, _table: &'a str) -> StoreFuture<'a, ()> {
            Box::pin(async { Err(StoreError::Transport("connection refused".to_string())) })
        }
    }

    impl BlobStore for DownStore {
        fn upload<'a>(&'a self, _bucket: &'a str, _name: &'a str, _blob: Blob) -> StoreFuture<'a, ()> {
            Box::pin(async { Err(StoreError::Transport("connection refused".to_string())) })
        }

        fn public_url(&self, bucket: &str, name: &str) -> String {
            format!("http://down/{bucket}/{name}")
        }

        fn download<'a>(&'a self, _bucket: &'a str, _name: &'a str) -> StoreFuture<'a, Option<Blob>> {
            Box::pin(async { Err(StoreError::Transport("connection refused".to_string())) })
        }
    }

    async fn row_count(store: &LocalStore) -> usize {
        store.select(TABLE, &Query::new()).await.unwrap().len()
    }

    #[tokio::test]
    async fn empty_store_reads_empty_address() {
        let settings = manager(Arc::new(local()), WriteStrategy::CheckThenAct);
        assert_eq!(settings.get_background().await, "");
        assert_eq!(settings.try_get_background().await.unwrap(), None);
    }

    #[tokio::test]
    async fn failing_store_reads_empty_address() {
        let settings = manager(Arc::new(DownStore), WriteStrategy::CheckThenAct);
        assert_eq!(settings.get_background().await, "");
        assert!(settings.try_get_background().await.is_err());
        assert!(settings.set_background("x").await.is_err());
    }

    #[tokio::test]
    async fn last_write_wins_and_row_is_reused() {
        let store = local();
        let settings = manager(Arc::new(store.clone()), WriteStrategy::CheckThenAct);

        settings.set_background("https://cdn/a.png").await.unwrap();
        settings.set_background("https://cdn/b.png").await.unwrap();

        assert_eq!(settings.get_background().await, "https://cdn/b.png");
        assert_eq!(row_count(&store).await, 1);
    }

    #[tokio::test]
    async fn existing_row_is_updated_in_place() {
        let store = local();
        let mut seed = Row::new();
        seed.insert("id".to_string(), Value::from(7));
        seed.insert("background_url".to_string(), Value::Null);
        store.insert(TABLE, vec![seed]).await.unwrap();

        let settings = manager(Arc::new(store.clone()), WriteStrategy::CheckThenAct);
        assert_eq!(settings.get_background().await, "");

        settings.set_background("https://cdn/a.png").await.unwrap();
        let record = settings.current().await.unwrap().unwrap();
        assert_eq!(record.id, 7);
        assert_eq!(record.background_url.as_deref(), Some("https://cdn/a.png"));
    }

    #[tokio::test]
    async fn upsert_strategy_pins_the_fixed_id() {
        let store = local();
        let settings = manager(Arc::new(store.clone()), WriteStrategy::Upsert);

        settings.set_background("a").await.unwrap();
        settings.set_background("b").await.unwrap();

        let record = settings.current().await.unwrap().unwrap();
        assert_eq!(record.id, SETTINGS_ROW_ID);
        assert_eq!(record.background_url.as_deref(), Some("b"));
        assert_eq!(row_count(&store).await, 1);
    }

    // Two first writers racing under check-then-act can both miss the
    // lookup and both insert. This is accepted for a single-admin board;
    // the test pins the behaviour down rather than guarding against it.
    #[tokio::test]
    async fn concurrent_first_writes_may_duplicate_the_row() {
        let inner = local();
        let store = Arc::new(LockstepStore {
            inner: inner.clone(),
            barrier: Barrier::new(2),
        });
        let settings = manager(store, WriteStrategy::CheckThenAct);

        let (a, b) = tokio::join!(settings.set_background("a"), settings.set_background("b"));
        a.unwrap();
        b.unwrap();

        assert_eq!(row_count(&inner).await, 2);
        // Reads still settle on one row: the lowest id.
        let visible = manager(Arc::new(inner), WriteStrategy::CheckThenAct);
        assert_eq!(visible.current().await.unwrap().unwrap().id, 1);
    }

    #[tokio::test]
    async fn upsert_strategy_keeps_one_row_under_the_same_race() {
        let inner = local();
        let store = Arc::new(LockstepStore {
            inner: inner.clone(),
            barrier: Barrier::new(2),
        });
        let settings = manager(store, WriteStrategy::Upsert);

        let (a, b) = tokio::join!(settings.set_background("a"), settings.set_background("b"));
        a.unwrap();
        b.unwrap();

        assert_eq!(row_count(&inner).await, 1);
    }
}
