//! LocalStore — redb-backed stand-in for the hosted store.
//!
//! Rows are JSON-serialized into redb's `&[u8]` value columns, blobs are
//! stored verbatim next to their content type. Like the hosted database,
//! ids are assigned from a per-table sequence and an explicit id that is
//! already taken is rejected. Supports on-disk and in-memory backends (the
//! latter for tests and throwaway runs).

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use redb::{Database, ReadableDatabase, ReadableTable};
use serde_json::Value;
use tracing::debug;

use crate::backend::{Blob, BlobStore, ID_COLUMN, Query, RecordStore, Row, StoreFuture};
use crate::error::{StoreError, StoreResult};
use crate::tables::*;

/// Convert any `Display` error into a `StoreError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StoreError::$variant(e.to_string())
    };
}

/// Thread-safe local store backed by redb.
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Database>,
    public_base_url: String,
}

/// Validate an explicit id from a client-supplied row.
fn explicit_id(value: &Value) -> StoreResult<u64> {
    value
        .as_u64()
        .ok_or_else(|| StoreError::Rejected(format!("id must be a non-negative integer, got {value}")))
}

fn decode_row(bytes: &[u8]) -> StoreResult<Row> {
    serde_json::from_slice(bytes).map_err(map_err!(Deserialize))
}

fn encode_row(row: &Row) -> StoreResult<Vec<u8>> {
    serde_json::to_vec(row).map_err(map_err!(Serialize))
}

impl LocalStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path, public_base_url: impl Into<String>) -> StoreResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self {
            db: Arc::new(db),
            public_base_url: public_base_url.into(),
        };
        store.ensure_tables()?;
        debug!(?path, "local store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store.
    pub fn open_in_memory(public_base_url: impl Into<String>) -> StoreResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self {
            db: Arc::new(db),
            public_base_url: public_base_url.into(),
        };
        store.ensure_tables()?;
        debug!("in-memory local store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(ROWS).map_err(map_err!(Table))?;
        txn.open_table(SEQUENCES).map_err(map_err!(Table))?;
        txn.open_table(BLOBS).map_err(map_err!(Table))?;
        txn.open_table(BLOB_TYPES).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Rows ───────────────────────────────────────────────────────

    fn select_rows(&self, table: &str, query: &Query) -> StoreResult<Vec<Row>> {
        let prefix = row_prefix(table);
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let rows = txn.open_table(ROWS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in rows.iter().map_err(map_err!(Read))? {
            if query.max_rows().is_some_and(|max| results.len() >= max) {
                break;
            }
            let (key, value) = entry.map_err(map_err!(Read))?;
            if !key.value().starts_with(&prefix) {
                continue;
            }
            let row = decode_row(value.value())?;
            if query.matches(&row) {
                results.push(query.project(row));
            }
        }
        Ok(results)
    }

    fn insert_rows(&self, table: &str, new_rows: Vec<Row>) -> StoreResult<()> {
        let count = new_rows.len();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut rows = txn.open_table(ROWS).map_err(map_err!(Table))?;
            let mut sequences = txn.open_table(SEQUENCES).map_err(map_err!(Table))?;
            let mut last = sequences
                .get(table)
                .map_err(map_err!(Read))?
                .map(|guard| guard.value())
                .unwrap_or(0);

            for mut row in new_rows {
                let id = match row.get(ID_COLUMN).filter(|v| !v.is_null()) {
                    Some(value) => explicit_id(value)?,
                    None => {
                        let id = last + 1;
                        row.insert(ID_COLUMN.to_string(), Value::from(id));
                        id
                    }
                };
                let key = row_key(table, id);
                if rows.get(key.as_str()).map_err(map_err!(Read))?.is_some() {
                    // Dropping the transaction without commit discards the batch.
                    return Err(StoreError::Rejected(format!(
                        "duplicate key value violates unique constraint on {table}.id = {id}"
                    )));
                }
                let value = encode_row(&row)?;
                rows.insert(key.as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;
                last = last.max(id);
            }
            sequences.insert(table, last).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%table, rows = count, "rows inserted");
        Ok(())
    }

    /// Merge `patch` into the row with `id`, inserting it when `create` is set.
    fn merge_row(&self, table: &str, id: u64, patch: Row, create: bool) -> StoreResult<bool> {
        let key = row_key(table, id);
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let written;
        {
            let mut rows = txn.open_table(ROWS).map_err(map_err!(Table))?;
            let existing = match rows.get(key.as_str()).map_err(map_err!(Read))? {
                Some(guard) => Some(decode_row(guard.value())?),
                None => None,
            };
            let merged = match existing {
                Some(mut row) => {
                    for (column, value) in patch {
                        if column != ID_COLUMN {
                            row.insert(column, value);
                        }
                    }
                    Some(row)
                }
                None if create => {
                    let mut row = patch;
                    row.insert(ID_COLUMN.to_string(), Value::from(id));
                    Some(row)
                }
                None => None,
            };
            written = merged.is_some();
            if let Some(row) = merged {
                let value = encode_row(&row)?;
                rows.insert(key.as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;
                let mut sequences = txn.open_table(SEQUENCES).map_err(map_err!(Table))?;
                let last = sequences
                    .get(table)
                    .map_err(map_err!(Read))?
                    .map(|guard| guard.value())
                    .unwrap_or(0);
                sequences
                    .insert(table, last.max(id))
                    .map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%table, id, written, "row merged");
        Ok(written)
    }

    fn delete_rows(&self, table: &str) -> StoreResult<usize> {
        let prefix = row_prefix(table);
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let count;
        {
            let mut rows = txn.open_table(ROWS).map_err(map_err!(Table))?;
            let mut keys = Vec::new();
            for entry in rows.iter().map_err(map_err!(Read))? {
                let (key, _) = entry.map_err(map_err!(Read))?;
                let key = key.value().to_string();
                if key.starts_with(&prefix) {
                    keys.push(key);
                }
            }
            count = keys.len();
            for key in &keys {
                rows.remove(key.as_str()).map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%table, rows = count, "rows deleted");
        Ok(count)
    }

    // ── Blobs ──────────────────────────────────────────────────────

    fn put_blob(&self, bucket: &str, name: &str, blob: &Blob) -> StoreResult<()> {
        let key = blob_key(bucket, name);
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut blobs = txn.open_table(BLOBS).map_err(map_err!(Table))?;
            if blobs.get(key.as_str()).map_err(map_err!(Read))?.is_some() {
                return Err(StoreError::Rejected(format!(
                    "the resource already exists: {key}"
                )));
            }
            blobs
                .insert(key.as_str(), blob.data.as_ref())
                .map_err(map_err!(Write))?;
            let mut types = txn.open_table(BLOB_TYPES).map_err(map_err!(Table))?;
            types
                .insert(key.as_str(), blob.content_type.as_str())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, bytes = blob.data.len(), "blob stored");
        Ok(())
    }

    fn get_blob(&self, bucket: &str, name: &str) -> StoreResult<Option<Blob>> {
        let key = blob_key(bucket, name);
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let blobs = txn.open_table(BLOBS).map_err(map_err!(Table))?;
        let data = match blobs.get(key.as_str()).map_err(map_err!(Read))? {
            Some(guard) => Bytes::copy_from_slice(guard.value()),
            None => return Ok(None),
        };
        let types = txn.open_table(BLOB_TYPES).map_err(map_err!(Table))?;
        let content_type = types
            .get(key.as_str())
            .map_err(map_err!(Read))?
            .map(|guard| guard.value().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        Ok(Some(Blob { data, content_type }))
    }
}

impl RecordStore for LocalStore {
    fn select<'a>(&'a self, table: &'a str, query: &'a Query) -> StoreFuture<'a, Vec<Row>> {
        Box::pin(async move { self.select_rows(table, query) })
    }

    fn insert<'a>(&'a self, table: &'a str, rows: Vec<Row>) -> StoreFuture<'a, ()> {
        Box::pin(async move { self.insert_rows(table, rows) })
    }

    fn update<'a>(&'a self, table: &'a str, id: i64, patch: Row) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            // Negative ids can never exist, so the update matches nothing.
            if let Ok(id) = u64::try_from(id) {
                self.merge_row(table, id, patch, false)?;
            }
            Ok(())
        })
    }

    fn upsert<'a>(&'a self, table: &'a str, row: Row) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let id = match row.get(ID_COLUMN) {
                Some(value) => explicit_id(value)?,
                None => {
                    return Err(StoreError::Rejected(
                        "upsert requires an id column".to_string(),
                    ));
                }
            };
            self.merge_row(table, id, row, true).map(|_| ())
        })
    }

    fn delete_all<'a>(&'a self, table: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move { self.delete_rows(table).map(|_| ()) })
    }
}

impl BlobStore for LocalStore {
    fn upload<'a>(&'a self, bucket: &'a str, name: &'a str, blob: Blob) -> StoreFuture<'a, ()> {
        Box::pin(async move { self.put_blob(bucket, name, &blob) })
    }

    fn public_url(&self, bucket: &str, name: &str) -> String {
        format!(
            "{}/storage/{bucket}/{name}",
            self.public_base_url.trim_end_matches('/')
        )
    }

    fn download<'a>(&'a self, bucket: &'a str, name: &'a str) -> StoreFuture<'a, Option<Blob>> {
        Box::pin(async move { self.get_blob(bucket, name) })
    }
}
