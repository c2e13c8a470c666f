//! High-level SDK for Our Infinity.
//!
//! [`Journal`] bundles a record store, a media store, and the membership
//! ledger behind one API. This is the main entry point for applications
//! embedding the journal.

pub mod config;
pub mod error;
pub mod journal;

pub use config::JournalConfig;
pub use error::{SdkError, SdkResult};
pub use journal::Journal;

// Re-export key types
pub use infinity_ledger::{
    AddOutcome, AttachStatus, BatchUpload, LedgerConfig, LedgerError, SelectionChange,
    UploadReceipt,
};
pub use infinity_order::ReorderRequest;
pub use infinity_types::{
    Album, AlbumId, AlbumSummary, AlbumUpdate, AlbumWithPhotos, Entry, EntryId, Membership, Photo,
    PhotoId, PhotoOwner, PhotoUpload, PhotoView,
};
