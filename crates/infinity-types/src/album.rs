//! Albums and their read-side views.

use serde::{Deserialize, Serialize};

use crate::entry::non_blank;
use crate::error::TypeError;
use crate::id::{AlbumId, PhotoId};
use crate::photo::PhotoView;
use crate::time::{self, Timestamp};

/// Validate and normalize an album name.
///
/// Names are trimmed; a name that is empty after trimming is rejected.
pub fn validate_album_name(name: &str) -> Result<String, TypeError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TypeError::EmptyAlbumName);
    }
    Ok(name.to_string())
}

/// A stored album row.
///
/// `cover_photo_id` is a weak reference: the photo may be deleted without
/// touching the album, and a dangling cover simply renders as absent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: AlbumId,
    pub name: String,
    pub description: Option<String>,
    pub cover_photo_id: Option<PhotoId>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: Timestamp,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: Timestamp,
}

impl Album {
    pub fn new(name: &str, description: Option<&str>) -> Result<Self, TypeError> {
        let name = validate_album_name(name)?;
        let now = time::now();
        Ok(Self {
            id: AlbumId::new(),
            name,
            description: non_blank(description),
            cover_photo_id: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// A partial album update. `None` leaves a field alone; for the optional
/// fields `Some(None)` clears them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AlbumUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub cover_photo_id: Option<Option<PhotoId>>,
}

impl AlbumUpdate {
    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn describe(mut self, description: Option<&str>) -> Self {
        self.description = Some(description.map(str::to_string));
        self
    }

    pub fn cover(mut self, photo: Option<PhotoId>) -> Self {
        self.cover_photo_id = Some(photo);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.cover_photo_id.is_none()
    }

    /// Apply to `album`, bumping `updated_at`.
    pub fn apply_to(&self, album: &mut Album) -> Result<(), TypeError> {
        if let Some(name) = &self.name {
            album.name = validate_album_name(name)?;
        }
        if let Some(description) = &self.description {
            album.description = non_blank(description.as_deref());
        }
        if let Some(cover) = self.cover_photo_id {
            album.cover_photo_id = cover;
        }
        album.updated_at = time::now();
        Ok(())
    }
}

/// An album with its derived photo count and resolved cover URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumSummary {
    #[serde(flatten)]
    pub album: Album,
    pub cover_photo_url: Option<String>,
    pub photo_count: usize,
}

/// An album together with its photos in album order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumWithPhotos {
    #[serde(flatten)]
    pub summary: AlbumSummary,
    pub photos: Vec<PhotoView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_trimmed() {
        assert_eq!(validate_album_name("  Summer  ").unwrap(), "Summer");
    }

    #[test]
    fn blank_name_is_rejected() {
        assert_eq!(validate_album_name(" \t ").unwrap_err(), TypeError::EmptyAlbumName);
        assert!(Album::new("", None).is_err());
    }

    #[test]
    fn new_album_has_no_cover() {
        let album = Album::new("Trips", Some(" road trips ")).unwrap();
        assert_eq!(album.description.as_deref(), Some("road trips"));
        assert!(album.cover_photo_id.is_none());
        assert_eq!(album.created_at, album.updated_at);
    }

    #[test]
    fn update_applies_only_set_fields() {
        let mut album = Album::new("Trips", Some("old")).unwrap();
        let cover = PhotoId::new();
        AlbumUpdate::default()
            .cover(Some(cover))
            .apply_to(&mut album)
            .unwrap();
        assert_eq!(album.name, "Trips");
        assert_eq!(album.description.as_deref(), Some("old"));
        assert_eq!(album.cover_photo_id, Some(cover));

        AlbumUpdate::default()
            .rename("  Travel ")
            .describe(None)
            .cover(None)
            .apply_to(&mut album)
            .unwrap();
        assert_eq!(album.name, "Travel");
        assert!(album.description.is_none());
        assert!(album.cover_photo_id.is_none());
    }

    #[test]
    fn update_rejects_blank_rename() {
        let mut album = Album::new("Trips", None).unwrap();
        let err = AlbumUpdate::default().rename(" ").apply_to(&mut album).unwrap_err();
        assert_eq!(err, TypeError::EmptyAlbumName);
        assert_eq!(album.name, "Trips");
    }

    #[test]
    fn empty_update() {
        assert!(AlbumUpdate::default().is_empty());
        assert!(!AlbumUpdate::default().rename("x").is_empty());
    }
}
