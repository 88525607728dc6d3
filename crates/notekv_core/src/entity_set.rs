//! Sorted, duplicate-free sequences of entities.

use crate::entity::{Entity, ENTITY_LEN};
use crate::error::{CoreError, CoreResult};

/// An ascending, duplicate-free sequence of entities.
///
/// `EntitySet` is both an in-memory result type and the stored payload of an
/// index record. It encodes as a flat run of 8-byte big-endian entities.
///
/// [`search`](Self::search), [`insert`](Self::insert) and
/// [`remove`](Self::remove) assume the set is sorted. Sets built through
/// `insert`, [`FromIterator`] or [`From<Vec<Entity>>`] always are; a set
/// decoded from foreign bytes is trusted as stored. Results on unsorted input
/// are unspecified but memory safe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct EntitySet(Vec<Entity>);

impl EntitySet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index of the first element greater than or equal to `e`,
    /// or `len()` if there is none.
    #[must_use]
    pub fn search(&self, e: Entity) -> usize {
        self.0.partition_point(|x| *x < e)
    }

    /// Inserts `e` at its sorted position.
    ///
    /// Returns true if `e` was not already present.
    pub fn insert(&mut self, e: Entity) -> bool {
        let i = self.search(e);
        if self.0.get(i) == Some(&e) {
            return false;
        }
        self.0.insert(i, e);
        true
    }

    /// Removes `e` if present.
    ///
    /// Returns true if `e` was present.
    pub fn remove(&mut self, e: Entity) -> bool {
        let i = self.search(e);
        if self.0.get(i) == Some(&e) {
            self.0.remove(i);
            true
        } else {
            false
        }
    }

    /// Returns true if `e` is present.
    #[must_use]
    pub fn contains(&self, e: Entity) -> bool {
        self.0.get(self.search(e)) == Some(&e)
    }

    /// Element-wise equality.
    #[must_use]
    pub fn equal(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().zip(&other.0).all(|(a, b)| a == b)
    }

    /// Sorts and deduplicates, establishing the set invariant.
    pub fn sort(&mut self) {
        self.0.sort_unstable();
        self.0.dedup();
    }

    /// Returns the number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the set holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the entities as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Entity] {
        &self.0
    }

    /// Iterates over the entities in ascending order.
    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.0.iter()
    }

    /// Consumes the set, returning the underlying vector.
    #[must_use]
    pub fn into_vec(self) -> Vec<Entity> {
        self.0
    }

    /// Encodes as a concatenation of 8-byte big-endian entities.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut bs = vec![0u8; ENTITY_LEN * self.0.len()];
        for (e, chunk) in self.0.iter().zip(bs.chunks_exact_mut(ENTITY_LEN)) {
            e.encode_at(chunk);
        }
        bs
    }

    /// Decodes a concatenation of 8-byte big-endian entities.
    ///
    /// Empty input decodes to an empty set.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFormat`] if the length of `src` is not a
    /// multiple of eight.
    pub fn decode(src: &[u8]) -> CoreResult<Self> {
        if src.len() % ENTITY_LEN != 0 {
            return Err(CoreError::invalid_format(format!(
                "entity set length {} is not a multiple of {ENTITY_LEN}",
                src.len()
            )));
        }
        src.chunks_exact(ENTITY_LEN)
            .map(Entity::decode)
            .collect::<CoreResult<Vec<_>>>()
            .map(Self)
    }
}

impl From<Vec<Entity>> for EntitySet {
    fn from(entities: Vec<Entity>) -> Self {
        let mut set = Self(entities);
        set.sort();
        set
    }
}

impl FromIterator<Entity> for EntitySet {
    fn from_iter<I: IntoIterator<Item = Entity>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl IntoIterator for EntitySet {
    type Item = Entity;
    type IntoIter = std::vec::IntoIter<Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a EntitySet {
    type Item = &'a Entity;
    type IntoIter = std::slice::Iter<'a, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl AsRef<[Entity]> for EntitySet {
    fn as_ref(&self) -> &[Entity] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(values: &[u64]) -> EntitySet {
        values.iter().copied().map(Entity::new).collect()
    }

    #[test]
    fn insert_keeps_order() {
        let mut s = EntitySet::new();
        for v in [5, 1, 9, 3] {
            assert!(s.insert(Entity::new(v)));
        }
        assert_eq!(s, set(&[1, 3, 5, 9]));
    }

    #[test]
    fn insert_duplicate_is_noop() {
        let mut s = set(&[1, 2, 3]);
        assert!(!s.insert(Entity::new(2)));
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn remove_present_and_absent() {
        let mut s = set(&[1, 2, 3]);
        assert!(s.remove(Entity::new(2)));
        assert!(!s.remove(Entity::new(2)));
        assert!(!s.remove(Entity::new(7)));
        assert_eq!(s, set(&[1, 3]));
    }

    #[test]
    fn search_is_lower_bound() {
        let s = set(&[2, 4, 6]);
        assert_eq!(s.search(Entity::new(1)), 0);
        assert_eq!(s.search(Entity::new(2)), 0);
        assert_eq!(s.search(Entity::new(3)), 1);
        assert_eq!(s.search(Entity::new(6)), 2);
        assert_eq!(s.search(Entity::new(7)), 3);
    }

    #[test]
    fn equal_compares_elements() {
        assert!(set(&[1, 2]).equal(&set(&[1, 2])));
        assert!(!set(&[1, 2]).equal(&set(&[1, 3])));
        assert!(!set(&[1, 2]).equal(&set(&[1])));
        assert!(EntitySet::new().equal(&EntitySet::new()));
    }

    #[test]
    fn encode_layout() {
        let bytes = set(&[1, 258]).encode();
        assert_eq!(bytes, [0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 1, 2]);
    }

    #[test]
    fn decode_empty_is_empty_set() {
        assert!(EntitySet::decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn decode_rejects_partial_entity() {
        assert!(matches!(
            EntitySet::decode(&[0; 12]),
            Err(CoreError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn from_vec_sorts_and_dedups() {
        let s = EntitySet::from(vec![Entity::new(3), Entity::new(1), Entity::new(3)]);
        assert_eq!(s.as_slice(), &[Entity::new(1), Entity::new(3)]);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert(u64),
        Remove(u64),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u64..64).prop_map(Op::Insert),
            (0u64..64).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn operations_preserve_invariant(ops in prop::collection::vec(op_strategy(), 0..200)) {
            let mut s = EntitySet::new();
            let mut model = std::collections::BTreeSet::new();
            for op in ops {
                match op {
                    Op::Insert(v) => prop_assert_eq!(s.insert(Entity::new(v)), model.insert(v)),
                    Op::Remove(v) => prop_assert_eq!(s.remove(Entity::new(v)), model.remove(&v)),
                }
                prop_assert!(s.as_slice().windows(2).all(|w| w[0] < w[1]));
                for probe in 0u64..66 {
                    let expected = model.range(..probe).count();
                    prop_assert_eq!(s.search(Entity::new(probe)), expected);
                }
            }
            let expected: Vec<Entity> = model.into_iter().map(Entity::new).collect();
            prop_assert_eq!(s.as_slice(), expected.as_slice());
        }

        #[test]
        fn encode_decode_round_trip(values in prop::collection::vec(any::<u64>(), 0..50)) {
            let s: EntitySet = values.into_iter().map(Entity::new).collect();
            let bytes = s.encode();
            prop_assert_eq!(bytes.len() % ENTITY_LEN, 0);
            prop_assert_eq!(EntitySet::decode(&bytes).unwrap(), s);
        }
    }
}
