//! Membership ledger for Our Infinity.
//!
//! [`MembershipLedger`] owns the photo/album relation and every ordered
//! scope of the journal. It provides:
//! - Deduplicated, idempotent attach of a photo to albums, and detach
//! - Album picker saves ([`MembershipLedger::apply_album_selection`])
//! - Drag-and-drop reorders of albums and of the entry sequence, protected
//!   by a per-scope version guard
//! - The standalone bucket that owns photos uploaded straight to the gallery
//! - Photo uploads with validation, blob storage, and optional album attach
//! - Cascading deletes of photos, albums, and entries
//! - Album and gallery read models
//!
//! All storage goes through the [`RecordStore`] and [`BlobStore`]
//! collaborators; the ledger keeps no state between calls.
//!
//! [`RecordStore`]: infinity_store::RecordStore
//! [`BlobStore`]: infinity_store::BlobStore

pub mod albums;
pub mod cascade;
pub mod config;
pub mod entries;
pub mod error;
pub mod gallery;
pub mod ledger;
pub mod membership;

#[cfg(test)]
pub(crate) mod testing;

pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use gallery::{AttachStatus, BatchUpload, UploadReceipt};
pub use ledger::{album_scope, MembershipLedger, ENTRIES_SCOPE};
pub use membership::{AddOutcome, SelectionChange};
