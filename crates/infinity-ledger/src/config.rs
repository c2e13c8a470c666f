use serde::{Deserialize, Serialize};

/// Tunables for uploads and the standalone bucket.
///
/// Missing keys in a serialized config fall back to the defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Blob key prefix for uploaded photos (`<prefix>/<photo id>.<ext>`).
    pub media_prefix: String,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: usize,
    /// Uploads whose content type lacks this prefix are rejected.
    pub accepted_content_prefix: String,
    /// Title given to the standalone bucket and shown for its photos.
    pub bucket_title: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            media_prefix: "gallery".into(),
            max_upload_bytes: 25 * 1024 * 1024,
            accepted_content_prefix: "image/".into(),
            bucket_title: "Gallery".into(),
        }
    }
}
