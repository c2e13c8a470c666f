use crate::query::Table;

/// Errors from record and blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A write would violate a declared uniqueness constraint.
    #[error("unique constraint ({columns}) violated on {table}")]
    UniqueViolation { table: Table, columns: String },

    /// A guarded write found the scope at a different version.
    #[error("scope {scope} is at version {actual}, expected {expected}")]
    GuardRejected {
        scope: String,
        expected: u64,
        actual: u64,
    },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Blob key is empty or escapes the store namespace.
    #[error("invalid blob key: {0}")]
    InvalidKey(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend could not complete the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
