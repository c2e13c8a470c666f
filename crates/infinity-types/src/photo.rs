//! Photos, uploads, and read-side photo views.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use infinity_order::{OrderedItem, Position};

use crate::entry::StandaloneBucket;
use crate::error::TypeError;
use crate::id::{EntryId, PhotoId};
use crate::time::Timestamp;

/// A stored photo row.
///
/// Standalone gallery photos and photos embedded in an authored entry are
/// the same record; they differ only in the owning `entry_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub id: PhotoId,
    pub entry_id: EntryId,
    /// Public retrieval URL returned by the blob store.
    pub content: String,
    pub name: String,
    /// Blob store key holding the bytes.
    pub storage_key: String,
    /// BLAKE3 hex digest of the bytes.
    pub checksum: String,
    pub content_type: String,
    /// Position within the owning entry's content sequence.
    pub position: Position,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: Timestamp,
}

impl OrderedItem for Photo {
    type Id = PhotoId;

    fn item_id(&self) -> PhotoId {
        self.id
    }

    fn position(&self) -> Position {
        self.position
    }

    fn set_position(&mut self, position: Position) {
        self.position = position;
    }
}

/// A photo joined with the title of its owning entry, as shown in grids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoView {
    #[serde(flatten)]
    pub photo: Photo,
    pub entry_title: String,
}

/// Where an uploaded photo lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhotoOwner {
    /// The standalone gallery bucket, created on first use.
    Gallery,
    /// An authored entry; it must already exist.
    Entry(EntryId),
}

impl From<StandaloneBucket> for PhotoOwner {
    fn from(_: StandaloneBucket) -> Self {
        Self::Gallery
    }
}

/// An image file handed over by the presentation layer.
#[derive(Clone, Debug)]
pub struct PhotoUpload {
    pub name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl PhotoUpload {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Check the upload before any I/O is attempted.
    pub fn validate(&self, accepted_prefix: &str, max_bytes: usize) -> Result<(), TypeError> {
        if self.bytes.is_empty() {
            return Err(TypeError::EmptyFile {
                name: self.name.clone(),
            });
        }
        if !self.content_type.starts_with(accepted_prefix) {
            return Err(TypeError::UnsupportedMediaType {
                name: self.name.clone(),
                content_type: self.content_type.clone(),
            });
        }
        if self.bytes.len() > max_bytes {
            return Err(TypeError::FileTooLarge {
                name: self.name.clone(),
                size: self.bytes.len(),
                limit: max_bytes,
            });
        }
        Ok(())
    }

    /// Lower-cased file extension, or `bin` when the name has none.
    pub fn extension(&self) -> String {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "bin".into())
    }

    /// BLAKE3 hex digest of the bytes.
    pub fn checksum(&self) -> String {
        hex::encode(blake3::hash(&self.bytes).as_bytes())
    }

    /// Display name, falling back to `image` like the gallery grid does.
    pub fn display_name(&self) -> String {
        let name = self.name.trim();
        if name.is_empty() {
            "image".into()
        } else {
            name.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, content_type: &str, bytes: &'static [u8]) -> PhotoUpload {
        PhotoUpload::new(name, content_type, Bytes::from_static(bytes))
    }

    #[test]
    fn valid_image_passes() {
        let u = upload("beach.JPG", "image/jpeg", b"\xff\xd8\xff");
        assert!(u.validate("image/", 1024).is_ok());
        assert_eq!(u.extension(), "jpg");
    }

    #[test]
    fn empty_file_is_rejected() {
        let u = upload("empty.png", "image/png", b"");
        assert_eq!(
            u.validate("image/", 1024).unwrap_err(),
            TypeError::EmptyFile {
                name: "empty.png".into()
            }
        );
    }

    #[test]
    fn non_image_is_rejected() {
        let u = upload("notes.txt", "text/plain", b"hello");
        assert!(matches!(
            u.validate("image/", 1024),
            Err(TypeError::UnsupportedMediaType { .. })
        ));
    }

    #[test]
    fn oversized_file_is_rejected() {
        let u = upload("big.png", "image/png", b"0123456789");
        assert_eq!(
            u.validate("image/", 4).unwrap_err(),
            TypeError::FileTooLarge {
                name: "big.png".into(),
                size: 10,
                limit: 4
            }
        );
    }

    #[test]
    fn extension_fallback() {
        assert_eq!(upload("noext", "image/png", b"x").extension(), "bin");
        assert_eq!(upload("trailing.", "image/png", b"x").extension(), "bin");
        assert_eq!(upload("a.tar.gz", "image/png", b"x").extension(), "gz");
    }

    #[test]
    fn checksum_is_content_derived() {
        let a = upload("a.png", "image/png", b"same");
        let b = upload("b.png", "image/png", b"same");
        let c = upload("c.png", "image/png", b"other");
        assert_eq!(a.checksum(), b.checksum());
        assert_ne!(a.checksum(), c.checksum());
        assert_eq!(a.checksum().len(), 64);
    }

    #[test]
    fn display_name_fallback() {
        assert_eq!(upload("  ", "image/png", b"x").display_name(), "image");
        assert_eq!(upload("cat.png", "image/png", b"x").display_name(), "cat.png");
    }
}
