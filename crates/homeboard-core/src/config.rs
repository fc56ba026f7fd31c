//! homeboard.toml configuration parser.
//!
//! Every key has a default, so an absent file is a valid configuration.
//! Hosted-store credentials are normally supplied through the environment
//! (`SUPABASE_URL`, `SUPABASE_KEY`) rather than written to disk.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::types::WriteStrategy;

/// Environment variable holding the hosted store endpoint.
pub const ENV_STORE_URL: &str = "SUPABASE_URL";

/// Environment variable holding the hosted store access key.
pub const ENV_STORE_KEY: &str = "SUPABASE_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub tables: TableNames,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound on a buffered upload request body.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

/// Which implementation backs the external store.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Hosted Postgres row API plus object storage over HTTPS.
    #[default]
    Hosted,
    /// Embedded redb database, for development without the hosted service.
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: BackendKind,
    pub url: Option<String>,
    pub key: Option<String>,
    /// redb file for the local backend. Unset means in-memory.
    pub data_path: Option<PathBuf>,
    /// Origin the local backend builds public blob addresses from.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableNames {
    #[serde(default = "default_settings_table")]
    pub settings: String,
    #[serde(default = "default_todos_table")]
    pub todos: String,
    #[serde(default = "default_events_table")]
    pub events: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsConfig {
    #[serde(default)]
    pub write_strategy: WriteStrategy,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_public_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_settings_table() -> String {
    "app_data".to_string()
}

fn default_todos_table() -> String {
    "todos".to_string()
}

fn default_events_table() -> String {
    "special_events".to_string()
}

fn default_bucket() -> String {
    "backgrounds".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            url: None,
            key: None,
            data_path: None,
            public_base_url: default_public_base_url(),
        }
    }
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            settings: default_settings_table(),
            todos: default_todos_table(),
            events: default_events_table(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
        }
    }
}

impl BoardConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: BoardConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from an optional file, then overlay the process environment.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Fill unset hosted-store credentials from `lookup`.
    ///
    /// Values already present in the file win. Empty variables count as unset.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if self.store.url.is_none() {
            self.store.url = non_empty(ENV_STORE_URL);
        }
        if self.store.key.is_none() {
            self.store.key = non_empty(ENV_STORE_KEY);
        }
    }

    /// Hosted endpoint and key, if both are configured.
    pub fn hosted_credentials(&self) -> Option<(&str, &str)> {
        match (self.store.url.as_deref(), self.store.key.as_deref()) {
            (Some(url), Some(key)) => Some((url, key)),
            _ => None,
        }
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
