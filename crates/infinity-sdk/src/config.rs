use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use infinity_ledger::LedgerConfig;

use crate::error::SdkResult;

/// Configuration for a persisted [`Journal`](crate::Journal).
///
/// Every key is optional in the TOML form:
///
/// ```toml
/// data_dir = "/home/ana/.infinity"
/// author = "ana"
///
/// [ledger]
/// max_upload_bytes = 10485760
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// Directory holding `records.json` and the `media/` tree.
    pub data_dir: PathBuf,
    /// Recorded as `created_by` on new entries.
    pub author: String,
    /// Serve media URLs under this base instead of `file://` paths.
    pub media_base_url: Option<String>,
    pub ledger: LedgerConfig,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".infinity"),
            author: "me".into(),
            media_base_url: None,
            ledger: LedgerConfig::default(),
        }
    }
}

impl JournalConfig {
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn records_path(&self) -> PathBuf {
        self.data_dir.join("records.json")
    }

    pub fn media_dir(&self) -> PathBuf {
        self.data_dir.join("media")
    }
}
