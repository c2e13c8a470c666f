//! Storage collaborators for Our Infinity.
//!
//! The ordering and membership logic never talks to a concrete database. It
//! goes through two narrow interfaces:
//!
//! - [`RecordStore`] -- a relational row store with `select`, `insert`,
//!   `update`, `delete`, conflict-aware `upsert`, and a version-guarded
//!   batch update used to protect reorders
//! - [`BlobStore`] -- keyed binary storage returning public retrieval URLs
//!
//! # Backends
//!
//! - [`InMemoryRecordStore`] / [`InMemoryBlobStore`] -- `HashMap`-based
//!   backends for tests and embedding, with one-shot fault injection
//! - [`FsBlobStore`] -- blobs as files under a root directory
//!
//! # Design Rules
//!
//! 1. Rows are `serde_json` maps; records convert with [`encode`] / [`decode`].
//! 2. Every table declares its uniqueness constraints; a `NULL` in a
//!    constrained column never conflicts.
//! 3. A call either applies completely or not at all.
//! 4. Every call is a suspension point; no lock is held across calls.
//! 5. All backend errors are propagated, never silently ignored.

pub mod error;
pub mod fs;
pub mod memory;
pub mod query;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsBlobStore;
pub use memory::{BlobOperation, InMemoryBlobStore, InMemoryRecordStore, Operation, Snapshot};
pub use query::{
    decode, decode_all, encode, validate_key, Filter, OnConflict, Order, Query, Row, RowUpdate,
    ScopeGuard, Table, UniqueKey,
};
pub use traits::{BlobStore, RecordStore};
