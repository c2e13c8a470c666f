//! Position assignment and renumbering for one ordering scope.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::OrderError;
use crate::traits::{OrderedItem, Position};

/// A drag-and-drop style reorder instruction: move the item at
/// `from_index` so that it ends up at `to_index`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub from_index: usize,
    pub to_index: usize,
}

impl ReorderRequest {
    pub fn new(from_index: usize, to_index: usize) -> Self {
        Self {
            from_index,
            to_index,
        }
    }

    /// Returns `true` if applying this request cannot change anything.
    pub fn is_noop(&self) -> bool {
        self.from_index == self.to_index
    }

    /// Apply this request to `items`. See [`reorder`].
    pub fn apply<T: OrderedItem>(&self, items: Vec<T>) -> Result<Vec<T>, OrderError> {
        reorder(items, self.from_index, self.to_index)
    }
}

/// A single persisted position change produced by [`changed_positions`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PositionUpdate<Id> {
    pub id: Id,
    pub position: Position,
}

/// Move the item at `from_index` to `to_index` and renumber the scope.
///
/// Every item receives its new index as its position, so the result is
/// always dense (`0..N`) regardless of gaps left by earlier removals. When
/// `from_index == to_index` the input is returned untouched, positions
/// included.
pub fn reorder<T: OrderedItem>(
    mut items: Vec<T>,
    from_index: usize,
    to_index: usize,
) -> Result<Vec<T>, OrderError> {
    let len = items.len();
    for index in [from_index, to_index] {
        if index >= len {
            return Err(OrderError::IndexOutOfBounds { index, len });
        }
    }

    if from_index == to_index {
        return Ok(items);
    }

    let moved = items.remove(from_index);
    items.insert(to_index, moved);

    for (index, item) in items.iter_mut().enumerate() {
        item.set_position(index as Position);
    }

    Ok(items)
}

/// The position to give an item appended to a scope.
///
/// Returns `max(existing) + 1`, or `0` for an empty scope. Siblings are
/// never renumbered and gaps are never reused, so a scope whose last item
/// sits at `Position::MAX` is full until it is reordered.
pub fn next_position<I>(existing: I) -> Result<Position, OrderError>
where
    I: IntoIterator<Item = Position>,
{
    match existing.into_iter().max() {
        None => Ok(0),
        Some(max) => max.checked_add(1).ok_or(OrderError::ScopeFull { last: max }),
    }
}

/// Positions in `after` that differ from (or are absent in) `before`.
///
/// Callers may persist only these updates instead of the whole scope.
pub fn changed_positions<T: OrderedItem>(before: &[T], after: &[T]) -> Vec<PositionUpdate<T::Id>> {
    let previous: HashMap<T::Id, Position> = before
        .iter()
        .map(|item| (item.item_id(), item.position()))
        .collect();

    after
        .iter()
        .filter(|item| previous.get(&item.item_id()) != Some(&item.position()))
        .map(|item| PositionUpdate {
            id: item.item_id(),
            position: item.position(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq)]
    struct Item {
        id: String,
        position: Position,
    }

    impl OrderedItem for Item {
        type Id = String;

        fn item_id(&self) -> Self::Id {
            self.id.clone()
        }

        fn position(&self) -> Position {
            self.position
        }

        fn set_position(&mut self, position: Position) {
            self.position = position;
        }
    }

    fn items(layout: &[(&'static str, Position)]) -> Vec<Item> {
        layout.iter()
            .map(|&(id, position)| Item {
                id: id.to_string(),
                position,
            })
            .collect()
    }

    fn ids(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    fn positions(items: &[Item]) -> Vec<Position> {
        items.iter().map(|i| i.position).collect()
    }

    #[test]
    fn move_last_entry_to_front() {
        let entries = items(&[("e1", 0), ("e2", 1), ("e3", 2), ("e4", 3)]);
        let result = reorder(entries, 3, 0).unwrap();
        assert_eq!(ids(&result), vec!["e4", "e1", "e2", "e3"]);
        assert_eq!(positions(&result), vec![0, 1, 2, 3]);
    }

    #[test]
    fn move_first_entry_down() {
        let entries = items(&[("a", 0), ("b", 1), ("c", 2)]);
        let result = reorder(entries, 0, 2).unwrap();
        assert_eq!(ids(&result), vec!["b", "c", "a"]);
        assert_eq!(positions(&result), vec![0, 1, 2]);
    }

    #[test]
    fn reorder_closes_gaps() {
        let photos = items(&[("p1", 0), ("p3", 2), ("p4", 3), ("p9", 17)]);
        let result = reorder(photos, 1, 2).unwrap();
        assert_eq!(ids(&result), vec!["p1", "p4", "p3", "p9"]);
        assert_eq!(positions(&result), vec![0, 1, 2, 3]);
    }

    #[test]
    fn noop_keeps_gaps() {
        let photos = items(&[("p1", 0), ("p3", 2), ("p4", 7)]);
        let result = reorder(photos.clone(), 1, 1).unwrap();
        assert_eq!(result, photos);
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let entries = items(&[("a", 0), ("b", 1)]);
        let err = reorder(entries, 0, 2).unwrap_err();
        assert_eq!(err, OrderError::IndexOutOfBounds { index: 2, len: 2 });

        let err = reorder(Vec::<Item>::new(), 0, 0).unwrap_err();
        assert_eq!(err, OrderError::IndexOutOfBounds { index: 0, len: 0 });
    }

    #[test]
    fn next_position_of_empty_scope_is_zero() {
        assert_eq!(next_position(std::iter::empty()), Ok(0));
    }

    #[test]
    fn next_position_skips_gaps() {
        // p2 was removed from [p1:0, p2:1, p3:2]; the gap at 1 stays.
        assert_eq!(next_position([0, 2]), Ok(3));
        assert_eq!(next_position([5]), Ok(6));
    }

    #[test]
    fn next_position_reports_a_full_scope() {
        assert_eq!(
            next_position([3, Position::MAX]),
            Err(OrderError::ScopeFull { last: Position::MAX })
        );
        assert_eq!(next_position([Position::MAX - 1]), Ok(Position::MAX));
    }

    #[test]
    fn changed_positions_reports_only_moves() {
        let before = items(&[("a", 0), ("b", 1), ("c", 2), ("d", 3)]);
        let after = reorder(before.clone(), 1, 2).unwrap();
        let changes = changed_positions(&before, &after);
        assert_eq!(
            changes,
            vec![
                PositionUpdate {
                    id: "c".to_string(),
                    position: 1
                },
                PositionUpdate {
                    id: "b".to_string(),
                    position: 2
                },
            ]
        );
    }

    #[test]
    fn changed_positions_of_noop_is_empty() {
        let before = items(&[("a", 4), ("b", 9)]);
        let after = reorder(before.clone(), 0, 0).unwrap();
        assert!(changed_positions(&before, &after).is_empty());
    }

    #[test]
    fn request_serde_shape() {
        let request = ReorderRequest::new(3, 0);
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"from_index":3,"to_index":0}"#);
        assert!(!request.is_noop());
        assert!(ReorderRequest::new(2, 2).is_noop());
    }

    fn scope_with_indices() -> impl Strategy<Value = (Vec<Position>, usize, usize)> {
        (1usize..40).prop_flat_map(|len| {
            (
                proptest::collection::vec(0u32..10_000, len),
                0..len,
                0..len,
            )
        })
    }

    fn labelled(positions: &[Position]) -> Vec<Item> {
        positions
            .iter()
            .enumerate()
            .map(|(i, &position)| Item {
                id: format!("item-{i}"),
                position,
            })
            .collect()
    }

    proptest! {
        #[test]
        fn reorder_yields_dense_positions((raw, from, to) in scope_with_indices()) {
            prop_assume!(from != to);
            let before = labelled(&raw);
            let moved = before[from].id.clone();
            let after = reorder(before.clone(), from, to).unwrap();

            let expected: Vec<Position> = (0..after.len() as Position).collect();
            prop_assert_eq!(positions(&after), expected);
            prop_assert_eq!(&after[to].id, &moved);

            let before_ids: HashSet<_> = ids(&before).into_iter().collect();
            let after_ids: HashSet<_> = ids(&after).into_iter().collect();
            prop_assert_eq!(before_ids, after_ids);
        }

        #[test]
        fn reorder_in_place_is_identity((raw, index, _other) in scope_with_indices()) {
            let before = labelled(&raw);
            let after = reorder(before.clone(), index, index).unwrap();
            prop_assert_eq!(after, before);
        }

        #[test]
        fn next_position_never_collides(raw in proptest::collection::vec(0u32..10_000, 0..50)) {
            let next = next_position(raw.iter().copied()).unwrap();
            prop_assert!(!raw.contains(&next));
            prop_assert!(raw.iter().all(|&p| p < next));
        }
    }
}
