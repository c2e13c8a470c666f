//! Foundation types for Our Infinity.
//!
//! This crate provides the identifiers and records shared by every other
//! crate in the workspace: journal entries, photos, albums, and the
//! photo/album membership rows. Records derive `serde` so they double as the
//! logical row shape handed to the storage backend.
//!
//! # Key Types
//!
//! - [`EntryId`], [`PhotoId`], [`AlbumId`] -- UUID v7 identifiers
//! - [`Entry`] -- a journal entry, or the [`StandaloneBucket`] that owns gallery photos
//! - [`Photo`] -- a stored image owned by an entry
//! - [`Album`] -- a named, user-created photo collection
//! - [`Membership`] -- one (album, photo) association with an album-local position

pub mod album;
pub mod entry;
pub mod error;
pub mod id;
pub mod membership;
pub mod photo;
pub mod time;

pub use album::{validate_album_name, Album, AlbumSummary, AlbumUpdate, AlbumWithPhotos};
pub use entry::{BucketKind, Entry, StandaloneBucket};
pub use error::TypeError;
pub use id::{AlbumId, EntryId, PhotoId};
pub use infinity_order::Position;
pub use membership::Membership;
pub use photo::{Photo, PhotoOwner, PhotoUpload, PhotoView};
pub use time::Timestamp;
