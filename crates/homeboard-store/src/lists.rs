//! Replace-all record lists (todos, special events).
//!
//! The board never edits a single item. A write deletes the whole table
//! and inserts the submitted set. The two steps are separate store calls:
//! if the insert fails after the delete succeeded, the list stays empty.

use tracing::debug;

use crate::backend::{Query, Row, SharedStore};
use crate::error::StoreResult;

#[derive(Clone)]
pub struct RecordList {
    store: SharedStore,
    table: String,
}

impl RecordList {
    pub fn new(store: SharedStore, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Every item, as stored.
    pub async fn fetch_all(&self) -> StoreResult<Vec<Row>> {
        self.store.select(&self.table, &Query::new()).await
    }

    /// Delete every item, then insert `items` (skipped when empty).
    pub async fn replace_all(&self, items: Vec<Row>) -> StoreResult<()> {
        let count = items.len();
        self.store.delete_all(&self.table).await?;
        if !items.is_empty() {
            self.store.insert(&self.table, items).await?;
        }
        debug!(table = %self.table, items = count, "list replaced");
        Ok(())
    }
}
