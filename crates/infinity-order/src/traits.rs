//! The [`OrderedItem`] trait implemented by everything that lives in an
//! ordering scope.

use std::hash::Hash;

/// A position inside one ordering scope.
pub type Position = u32;

/// An entity that participates in a user-orderable list.
///
/// The sequencer only ever reads the identifier and rewrites the position;
/// it never owns or otherwise mutates the entity.
pub trait OrderedItem {
    /// Stable identifier of the item within its scope.
    type Id: Clone + Eq + Hash;

    fn item_id(&self) -> Self::Id;

    fn position(&self) -> Position;

    fn set_position(&mut self, position: Position);
}
