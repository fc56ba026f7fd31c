//! redb table definitions for the local store.
//!
//! All tables use `&str` keys. Row keys are `{table}:{id:020}` so that a
//! plain key scan visits one table's rows in ascending id order.

use redb::TableDefinition;

/// JSON-encoded rows keyed by `{table}:{id:020}`.
pub const ROWS: TableDefinition<&str, &[u8]> = TableDefinition::new("rows");

/// Highest id handed out per table, keyed by table name.
pub const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

/// Blob bytes keyed by `{bucket}/{name}`.
pub const BLOBS: TableDefinition<&str, &[u8]> = TableDefinition::new("blobs");

/// Blob MIME types keyed by `{bucket}/{name}`.
pub const BLOB_TYPES: TableDefinition<&str, &str> = TableDefinition::new("blob_types");

/// Key prefix shared by every row of `table`.
pub fn row_prefix(table: &str) -> String {
    format!("{table}:")
}

pub fn row_key(table: &str, id: u64) -> String {
    format!("{table}:{id:020}")
}

pub fn blob_key(bucket: &str, name: &str) -> String {
    format!("{bucket}/{name}")
}
