//! Journal entries and the standalone bucket.

use serde::{Deserialize, Serialize};

use infinity_order::{OrderedItem, Position};

use crate::error::TypeError;
use crate::id::EntryId;
use crate::time::{self, Timestamp};

/// Marker distinguishing a system-owned container entry from authored ones.
///
/// Stored in the `bucket` column, which carries a uniqueness constraint:
/// at most one entry may hold each marker, while authored entries (marker
/// `NULL`) never conflict with each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketKind {
    /// Owns photos uploaded straight into the gallery.
    Gallery,
}

impl BucketKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gallery => "gallery",
        }
    }
}

impl From<BucketKind> for serde_json::Value {
    fn from(kind: BucketKind) -> Self {
        serde_json::Value::String(kind.as_str().to_string())
    }
}

/// A journal entry row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub title: String,
    pub description: Option<String>,
    /// `Some` only for the standalone bucket.
    pub bucket: Option<BucketKind>,
    pub position: Position,
    pub created_by: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: Timestamp,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: Timestamp,
}

impl Entry {
    /// A new authored entry at `position`. The title is trimmed and must not
    /// be empty.
    pub fn authored(
        title: &str,
        description: Option<&str>,
        created_by: &str,
        position: Position,
    ) -> Result<Self, TypeError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TypeError::EmptyEntryTitle);
        }
        let now = time::now();
        Ok(Self {
            id: EntryId::new(),
            title: title.to_string(),
            description: non_blank(description),
            bucket: None,
            position,
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    /// A new system-owned bucket entry. Buckets sit outside the authored
    /// ordering scope, so their position is fixed at zero.
    pub fn bucket(kind: BucketKind, title: &str) -> Self {
        let now = time::now();
        Self {
            id: EntryId::new(),
            title: title.to_string(),
            description: Some(format!("System entry for {} photos", kind.as_str())),
            bucket: Some(kind),
            position: 0,
            created_by: "system".into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_standalone_bucket(&self) -> bool {
        self.bucket.is_some()
    }
}

impl OrderedItem for Entry {
    type Id = EntryId;

    fn item_id(&self) -> EntryId {
        self.id
    }

    fn position(&self) -> Position {
        self.position
    }

    fn set_position(&mut self, position: Position) {
        self.position = position;
    }
}

/// Typed reference to the entry owning standalone gallery photos.
///
/// Distinct from [`EntryId`] so that call sites cannot confuse the bucket
/// with an authored entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StandaloneBucket {
    entry_id: EntryId,
    kind: BucketKind,
}

impl StandaloneBucket {
    /// The bucket reference for `entry`, if it is a bucket.
    pub fn from_entry(entry: &Entry) -> Option<Self> {
        entry.bucket.map(|kind| Self {
            entry_id: entry.id,
            kind,
        })
    }

    pub fn entry_id(&self) -> EntryId {
        self.entry_id
    }

    pub fn kind(&self) -> BucketKind {
        self.kind
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
