//! Shared settings types.

use serde::{Deserialize, Serialize};

/// Identifier the `upsert` write strategy pins the settings row to.
pub const SETTINGS_ROW_ID: i64 = 1;

/// Column holding the background address in the settings table.
pub const BACKGROUND_COLUMN: &str = "background_url";

/// The singleton settings row.
///
/// `background_url` is nullable in the hosted schema, so a row can exist
/// without an address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SettingsRecord {
    pub id: i64,
    #[serde(default)]
    pub background_url: Option<String>,
}

/// How the settings row is written.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WriteStrategy {
    /// Look up the first row, then update it or insert a fresh one.
    ///
    /// Two concurrent first writers can both miss the lookup and insert
    /// two rows. Reads and writes both resolve the lowest `id`, so a
    /// duplicate never splits the visible value.
    #[default]
    CheckThenAct,
    /// Single insert-or-update keyed by [`SETTINGS_ROW_ID`].
    Upsert,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_record_tolerates_null_background() {
        let record: SettingsRecord =
            serde_json::from_str(r#"{"id": 4, "background_url": null}"#).unwrap();
        assert_eq!(record.id, 4);
        assert_eq!(record.background_url, None);
    }

    #[test]
    fn write_strategy_uses_snake_case() {
        let s: WriteStrategy = serde_json::from_str(r#""check_then_act""#).unwrap();
        assert_eq!(s, WriteStrategy::CheckThenAct);
        let s: WriteStrategy = serde_json::from_str(r#""upsert""#).unwrap();
        assert_eq!(s, WriteStrategy::Upsert);
    }
}
