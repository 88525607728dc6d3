//! Property-based test generators using proptest.
//!
//! Strategies keep the invariants the stores rely on: entity sets are sorted
//! and duplicate-free, and index layouts never repeat an index value.

use notekv_core::{Component, Entity, EntitySet};
use proptest::prelude::*;

/// Strategy for entities, excluding the reserved [`Entity::NONE`] and
/// [`Entity::MAX`].
pub fn entity_strategy() -> impl Strategy<Value = Entity> {
    (1..u64::MAX).prop_map(Entity::new)
}

/// Strategy for entities drawn from a small range, so collisions happen.
pub fn small_entity_strategy() -> impl Strategy<Value = Entity> {
    (1u64..64).prop_map(Entity::new)
}

/// Strategy for components.
pub fn component_strategy() -> impl Strategy<Value = Component> {
    any::<u16>().prop_map(Component::new)
}

/// Strategy for entity sets of up to `max_len` members.
pub fn entity_set_strategy(max_len: usize) -> impl Strategy<Value = EntitySet> {
    prop::collection::btree_set(small_entity_strategy(), 0..=max_len)
        .prop_map(|set| set.into_iter().collect())
}

/// Strategy for index values: short byte strings, possibly empty.
pub fn index_value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..6)
}

/// Strategy for the records of one index: distinct values in ascending
/// order, each with its entity set. Sets may be empty.
pub fn index_layout_strategy(
    max_records: usize,
    max_set_len: usize,
) -> impl Strategy<Value = Vec<(Vec<u8>, EntitySet)>> {
    prop::collection::btree_map(
        index_value_strategy(),
        entity_set_strategy(max_set_len),
        0..=max_records,
    )
    .prop_map(|records| records.into_iter().collect())
}

/// Strategy for page sizes. Zero means unbounded.
pub fn page_size_strategy() -> impl Strategy<Value = usize> {
    prop_oneof![
        1 => Just(0usize),
        4 => 1usize..8,
    ]
}

/// An edit applied to an [`EntitySet`] and to a model set alongside it.
#[derive(Debug, Clone)]
pub enum SetOperation {
    /// Insert an entity.
    Insert(Entity),
    /// Remove an entity.
    Remove(Entity),
}

/// Strategy for set operations over a small entity range.
pub fn set_operation_strategy() -> impl Strategy<Value = SetOperation> {
    prop_oneof![
        3 => small_entity_strategy().prop_map(SetOperation::Insert),
        2 => small_entity_strategy().prop_map(SetOperation::Remove),
    ]
}

/// Strategy for a sequence of set operations.
pub fn set_operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<SetOperation>> {
    prop::collection::vec(set_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn entities_avoid_reserved_values(e in entity_strategy()) {
            prop_assert!(!e.is_none());
            prop_assert_ne!(e, Entity::MAX);
        }

        #[test]
        fn entity_sets_are_sorted(set in entity_set_strategy(16)) {
            prop_assert!(set.as_slice().windows(2).all(|w| w[0] < w[1]));
        }

        #[test]
        fn index_layouts_ascend(layout in index_layout_strategy(6, 4)) {
            prop_assert!(layout.windows(2).all(|w| w[0].0 < w[1].0));
        }
    }
}
