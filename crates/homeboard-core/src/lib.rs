//! homeboard-core — configuration and shared types for homeboard.
//!
//! Everything here is plain data: the TOML/environment configuration the
//! daemon starts from, and the settings-row shape the store and API agree on.

pub mod config;
pub mod types;

pub use config::BoardConfig;
pub use types::*;
