//! The bundle of store-backed services a running board needs.

use std::sync::Arc;

use homeboard_core::BoardConfig;
use homeboard_core::config::BackendKind;
use tracing::{info, warn};

use crate::backend::SharedStore;
use crate::error::StoreResult;
use crate::hosted::HostedStore;
use crate::lists::RecordList;
use crate::local::LocalStore;
use crate::settings::SettingsManager;
use crate::uploads::UploadPublisher;

/// Store handle plus the services layered on it.
///
/// Cheap to clone; every field is a shared handle.
#[derive(Clone)]
pub struct Board {
    pub store: SharedStore,
    pub settings: SettingsManager,
    pub todos: RecordList,
    pub events: RecordList,
    pub uploads: UploadPublisher,
}

impl Board {
    pub fn new(store: SharedStore, config: &BoardConfig) -> Self {
        let settings = SettingsManager::new(
            store.clone(),
            config.tables.settings.clone(),
            config.settings.write_strategy,
        );
        Self {
            todos: RecordList::new(store.clone(), config.tables.todos.clone()),
            events: RecordList::new(store.clone(), config.tables.events.clone()),
            uploads: UploadPublisher::new(store.clone(), config.storage.bucket.clone(), settings.clone()),
            settings,
            store,
        }
    }

    /// Open the configured backend and build a board on it.
    ///
    /// Returns `Ok(None)` when the hosted backend is selected but its
    /// endpoint or key is missing; the caller decides how to run without it.
    pub fn from_config(config: &BoardConfig) -> StoreResult<Option<Self>> {
        Ok(open_store(config)?.map(|store| Self::new(store, config)))
    }
}

/// Open whichever backend `config` selects.
pub fn open_store(config: &BoardConfig) -> StoreResult<Option<SharedStore>> {
    match config.store.backend {
        BackendKind::Hosted => match config.hosted_credentials() {
            Some((url, key)) => {
                info!(%url, "using hosted store");
                Ok(Some(Arc::new(HostedStore::new(url, key))))
            }
            None => {
                warn!("hosted store endpoint or key missing");
                Ok(None)
            }
        },
        BackendKind::Local => {
            let base = config.store.public_base_url.clone();
            let store = match &config.store.data_path {
                Some(path) => LocalStore::open(path, base)?,
                None => LocalStore::open_in_memory(base)?,
            };
            info!(path = ?config.store.data_path, "using local store");
            Ok(Some(Arc::new(store)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hosted_without_credentials_yields_no_board() {
        let config = BoardConfig::default();
        assert!(Board::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn hosted_with_credentials_yields_board() {
        let mut config = BoardConfig::default();
        config.store.url = Some("https://proj.supabase.co".to_string());
        config.store.key = Some("key".to_string());
        let board = Board::from_config(&config).unwrap().unwrap();
        assert_eq!(board.todos.table(), "todos");
        assert_eq!(board.events.table(), "special_events");
        assert_eq!(board.uploads.bucket(), "backgrounds");
    }

    #[tokio::test]
    async fn local_board_round_trips_background() {
        let mut config = BoardConfig::default();
        config.store.backend = BackendKind::Local;
        let board = Board::from_config(&config).unwrap().unwrap();

        board.settings.set_background("http://x/y.png").await.unwrap();
        assert_eq!(board.settings.get_background().await, "http://x/y.png");
    }

    #[test]
    fn local_board_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BoardConfig::default();
        config.store.backend = BackendKind::Local;
        config.store.data_path = Some(dir.path().join("board.redb"));
        assert!(Board::from_config(&config).unwrap().is_some());
        assert!(dir.path().join("board.redb").exists());
    }
}
