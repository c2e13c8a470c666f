use infinity_order::OrderError;
use infinity_store::{StoreError, Table};
use infinity_types::{AlbumId, EntryId, PhotoId, TypeError};

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("order error: {0}")]
    Order(#[from] OrderError),

    #[error("invalid input: {0}")]
    Invalid(#[from] TypeError),

    #[error("album not found: {0}")]
    AlbumNotFound(AlbumId),

    #[error("photo not found: {0}")]
    PhotoNotFound(PhotoId),

    #[error("entry not found: {0}")]
    EntryNotFound(EntryId),

    /// Another writer reordered the scope between our read and our write.
    #[error("ordering scope {scope} changed concurrently; reload and retry")]
    ConcurrentReorder { scope: String },

    #[error("entry {0} is the standalone bucket and cannot be deleted")]
    ProtectedEntry(EntryId),

    #[error("corrupt {table} row: {reason}")]
    Corrupt { table: Table, reason: String },
}

impl LedgerError {
    /// Whether this is one of the not-found errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::AlbumNotFound(_) | Self::PhotoNotFound(_) | Self::EntryNotFound(_)
        )
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
