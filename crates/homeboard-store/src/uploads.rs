//! Background uploads: blob naming and publishing.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::info;
use unicode_normalization::UnicodeNormalization;

use crate::backend::{Blob, SharedStore};
use crate::error::StoreResult;
use crate::settings::SettingsManager;

/// Name used when nothing of the client's filename survives sanitizing.
const FALLBACK_NAME: &str = "upload";

/// A file received from a client, fully buffered.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Reduce a client-supplied filename to a safe object name.
///
/// Accented letters decompose to their ASCII base (`é` becomes `e`) and
/// other non-ASCII text is dropped. Path separators become word breaks,
/// whitespace runs become `_`, and only ASCII alphanumerics plus `.`, `_`
/// and `-` survive. Leading and trailing dots and underscores are dropped,
/// so `../x` cannot climb.
pub fn sanitize_filename(name: &str) -> String {
    let spaced: String = name
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// `{unix seconds}.{nanoseconds}-{sanitized name}`.
pub fn unique_blob_name(filename: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}.{:09}-{}",
        at.timestamp(),
        at.timestamp_subsec_nanos(),
        sanitize_filename(filename)
    )
}

/// Stores uploads in one bucket and makes each the current background.
#[derive(Clone)]
pub struct UploadPublisher {
    store: SharedStore,
    bucket: String,
    settings: SettingsManager,
}

impl UploadPublisher {
    pub fn new(store: SharedStore, bucket: impl Into<String>, settings: SettingsManager) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            settings,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Upload, resolve the public address, record it as the background.
    ///
    /// Returns the public address. A settings failure after a successful
    /// upload leaves the blob orphaned; nothing cleans it up.
    pub async fn publish(&self, file: UploadedFile) -> StoreResult<String> {
        let name = unique_blob_name(&file.filename, Utc::now());
        let size = file.data.len();
        let blob = Blob {
            data: file.data,
            content_type: file.content_type,
        };
        self.store.upload(&self.bucket, &name, blob).await?;
        let url = self.store.public_url(&self.bucket, &name);
        self.settings.set_background(&url).await?;
        info!(bucket = %self.bucket, %name, bytes = size, "background published");
        Ok(url)
    }
}
