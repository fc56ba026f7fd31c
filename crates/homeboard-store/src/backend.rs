//! The external store contract.
//!
//! Handlers only ever see the store through these two traits: a row API
//! (select / insert / update / upsert / delete-all) and a blob API
//! (upload / public address / download). Both the hosted client and the
//! local redb store implement them.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;

use crate::error::StoreResult;

/// A stored record: an opaque JSON object.
pub type Row = serde_json::Map<String, Value>;

/// Boxed future alias for store calls.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// Name of the identifier column every table carries.
pub const ID_COLUMN: &str = "id";

/// Read the integer `id` of a row, if it has one.
pub fn row_id(row: &Row) -> Option<i64> {
    row.get(ID_COLUMN).and_then(Value::as_i64)
}

/// Row selection: equality filters, column projection and a limit.
///
/// Results are always ordered by `id` ascending, so `limit(1)` means
/// "the row with the lowest id".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    columns: Option<Vec<String>>,
    filters: Vec<(String, Value)>,
    limit: Option<usize>,
}

impl Query {
    /// Every column of every row.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push((column.to_string(), value.into()));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Column list in `select=` syntax (`*` when unprojected).
    pub fn select_clause(&self) -> String {
        match &self.columns {
            Some(columns) => columns.join(","),
            None => "*".to_string(),
        }
    }

    pub fn filters(&self) -> &[(String, Value)] {
        &self.filters
    }

    pub fn max_rows(&self) -> Option<usize> {
        self.limit
    }

    /// Whether `row` satisfies every equality filter.
    pub fn matches(&self, row: &Row) -> bool {
        self.filters
            .iter()
            .all(|(column, value)| row.get(column) == Some(value))
    }

    /// Drop columns that were not asked for.
    pub fn project(&self, row: Row) -> Row {
        match &self.columns {
            Some(columns) => row
                .into_iter()
                .filter(|(k, _)| columns.iter().any(|c| c == k))
                .collect(),
            None => row,
        }
    }
}

/// Blob bytes plus their MIME type.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub data: Bytes,
    pub content_type: String,
}

/// Row half of the external store.
pub trait RecordStore: Send + Sync {
    /// Rows of `table` matching `query`, ordered by id ascending.
    fn select<'a>(&'a self, table: &'a str, query: &'a Query) -> StoreFuture<'a, Vec<Row>>;

    /// Insert rows; the store assigns ids to rows without one.
    fn insert<'a>(&'a self, table: &'a str, rows: Vec<Row>) -> StoreFuture<'a, ()>;

    /// Merge `patch` into the row whose id is `id`. No match is not an error.
    fn update<'a>(&'a self, table: &'a str, id: i64, patch: Row) -> StoreFuture<'a, ()>;

    /// Insert `row`, or merge it into the existing row with the same id.
    fn upsert<'a>(&'a self, table: &'a str, row: Row) -> StoreFuture<'a, ()>;

    /// Delete every row whose id is not `-1`, i.e. all of them.
    fn delete_all<'a>(&'a self, table: &'a str) -> StoreFuture<'a, ()>;
}

/// Blob half of the external store.
pub trait BlobStore: Send + Sync {
    fn upload<'a>(&'a self, bucket: &'a str, name: &'a str, blob: Blob) -> StoreFuture<'a, ()>;

    /// Stable address a browser can fetch the blob from.
    fn public_url(&self, bucket: &str, name: &str) -> String;

    fn download<'a>(&'a self, bucket: &'a str, name: &'a str) -> StoreFuture<'a, Option<Blob>>;
}

/// Both halves together; what the rest of the workspace holds on to.
pub trait ExternalStore: RecordStore + BlobStore {}

impl<T: RecordStore + BlobStore + ?Sized> ExternalStore for T {}

/// Shared handle to whichever backend is configured.
pub type SharedStore = Arc<dyn ExternalStore>;
