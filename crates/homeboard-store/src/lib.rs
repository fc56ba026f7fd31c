//! homeboard-store — the external store behind homeboard.
//!
//! All persistence is delegated to a store reached through the
//! [`RecordStore`] + [`BlobStore`] contract:
//!
//! - [`HostedStore`] talks to the hosted Postgres row API and object storage.
//! - [`LocalStore`] is a redb-backed stand-in with the same contract, for
//!   development and tests.
//!
//! On top of the contract sit the board's services: the settings
//! singleton ([`SettingsManager`]), the replace-all lists ([`RecordList`])
//! and background uploads ([`UploadPublisher`]), bundled as [`Board`].
//!
//! No call is retried and nothing spans a transaction across two store
//! calls.

pub mod backend;
pub mod board;
pub mod error;
pub mod hosted;
pub mod lists;
pub mod local;
pub mod settings;
pub mod tables;
pub mod uploads;

pub use backend::{Blob, BlobStore, ExternalStore, Query, RecordStore, Row, SharedStore};
pub use board::{Board, open_store};
pub use error::{StoreError, StoreResult};
pub use hosted::HostedStore;
pub use lists::RecordList;
pub use local::LocalStore;
pub use settings::SettingsManager;
pub use uploads::{UploadPublisher, UploadedFile, sanitize_filename, unique_blob_name};
