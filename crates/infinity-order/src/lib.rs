//! Linear position sequencer for user-ordered lists.
//!
//! Every user-orderable collection in Our Infinity (the journal entry list,
//! the photos inside one album, the photos inside one entry) is an *ordering
//! scope*: a set of items whose integer positions must never collide. This
//! crate holds the pure ordering arithmetic and performs no I/O.
//!
//! # Operations
//!
//! - [`reorder`] -- move one item and renumber the whole scope densely
//! - [`next_position`] -- append-only fast path, never renumbers siblings
//! - [`changed_positions`] -- minimal diff between two orderings of a scope
//!
//! # Rules
//!
//! 1. After a completed reorder, positions are exactly `0..N`.
//! 2. A no-op reorder (`from == to`) returns the input untouched, gaps included.
//! 3. Appends use `max + 1`, so gaps left by removals are never reused.

pub mod error;
pub mod sequencer;
pub mod traits;

pub use error::OrderError;
pub use sequencer::{changed_positions, next_position, reorder, PositionUpdate, ReorderRequest};
pub use traits::{OrderedItem, Position};
