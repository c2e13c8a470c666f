use thiserror::Error;

use crate::traits::Position;

/// Errors produced by sequencer operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    /// A reorder index does not address an item in the scope.
    #[error("index {index} out of bounds for scope of {len} items")]
    IndexOutOfBounds { index: usize, len: usize },

    /// The last item already holds the largest position; nothing can be
    /// appended after it.
    #[error("no position left after {last}")]
    ScopeFull { last: Position },
}
