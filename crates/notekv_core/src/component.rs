//! Typed component values and index maintenance.
//!
//! A [`ComponentValue`] names the component it is stored under and the index
//! entries it produces. [`Partitioned::set_component`] keeps the index records
//! (entity sets keyed by `partition | component | 0 | index | value`) in step
//! with the stored values, so they can be paged through with
//! [`Partitioned::entities_by_component_index`].

use crate::entity::{Component, Entity};
use crate::entity_set::EntitySet;
use crate::error::{CoreError, CoreResult};
use crate::key::{Prefix, COMPONENT_PREFIX_LEN};
use crate::kv::Txn;
use crate::partitioned::Partitioned;
use crate::value::{Decoder, Encoder};

/// A record type stored as the value of one component.
///
/// `decode` must accept empty input (an entity without a value).
///
/// ```
/// use notekv_core::{Component, ComponentValue, CoreResult, Decoder, Encoder};
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Name(String);
///
/// impl Encoder for Name {
///     fn encode(&self) -> Vec<u8> {
///         self.0.encode()
///     }
/// }
///
/// impl Decoder for Name {
///     fn decode(src: &[u8]) -> CoreResult<Self> {
///         String::decode(src).map(Name)
///     }
/// }
///
/// impl ComponentValue for Name {
///     const COMPONENT: Component = Component::new(1);
///
///     fn index_values(&self) -> Vec<(Component, Vec<u8>)> {
///         vec![(Component::new(1), self.0.as_bytes().to_vec())]
///     }
/// }
/// ```
pub trait ComponentValue: Encoder + Decoder {
    /// The component this type is stored under.
    const COMPONENT: Component;

    /// Index entries for this value: `(index, encoded value)` pairs. An entity
    /// holding this value is listed in the record of each pair.
    fn index_values(&self) -> Vec<(Component, Vec<u8>)> {
        Vec::new()
    }
}

impl<T: Txn + ?Sized> Partitioned<'_, T> {
    /// Allocates a fresh entity through the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the allocator is exhausted.
    pub fn create_entity(&self) -> CoreResult<Entity> {
        self.txn.alloc()
    }

    /// Stores `value` for `entity` and updates the indexes it takes part in.
    ///
    /// Index records the previous value belonged to and the new one does not
    /// lose `entity`; records the new value belongs to gain it. A record left
    /// empty stays in place and contributes nothing to scans.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFormat`] for [`Entity::NONE`] and
    /// [`Entity::MAX`], decode errors for the previous value or an index
    /// record, or backend errors.
    pub fn set_component<V: ComponentValue>(&mut self, entity: Entity, value: &V) -> CoreResult<()> {
        if entity.is_reserved() {
            return Err(CoreError::invalid_format(format!(
                "entity {entity} is reserved and cannot hold a component value"
            )));
        }
        let key = Prefix::value(self.partition, V::COMPONENT, entity);

        let mut previous = None;
        self.txn.get(&key, |bytes| {
            if !bytes.is_empty() {
                previous = Some(V::decode(bytes)?);
            }
            Ok(())
        })?;
        let old_entries = previous.map(|v| v.index_values()).unwrap_or_default();
        let new_entries = value.index_values();

        for (index, ix_value) in &old_entries {
            if !contains_entry(&new_entries, *index, ix_value) {
                self.update_index(V::COMPONENT, *index, ix_value, |set| set.remove(entity))?;
            }
        }

        self.txn.set(&key, &value.encode())?;

        for (index, ix_value) in &new_entries {
            if !contains_entry(&old_entries, *index, ix_value) {
                self.update_index(V::COMPONENT, *index, ix_value, |set| set.insert(entity))?;
            }
        }
        Ok(())
    }

    /// Reads the value of `V` for `entity`; an absent value decodes from
    /// empty input.
    ///
    /// # Errors
    ///
    /// Returns decode or backend errors.
    pub fn get_component<V: ComponentValue>(&self, entity: Entity) -> CoreResult<V> {
        self.txn
            .get_value(&Prefix::value(self.partition, V::COMPONENT, entity))
    }

    /// Reads the value of `V` for each entity in `entities`, in order.
    ///
    /// # Errors
    ///
    /// Returns the first decode or backend error.
    pub fn get_component_slice<V: ComponentValue>(&self, entities: &[Entity]) -> CoreResult<Vec<V>> {
        let mut key = Prefix::value(self.partition, V::COMPONENT, Entity::NONE).into_vec();
        let mut out = Vec::with_capacity(entities.len());
        for e in entities {
            e.encode_at(&mut key[COMPONENT_PREFIX_LEN..]);
            out.push(self.txn.get_value(&key)?);
        }
        Ok(out)
    }

    /// Returns the entities listed under one exact index value.
    ///
    /// # Errors
    ///
    /// Returns decode or backend errors.
    pub fn index_lookup(
        &self,
        component: Component,
        index: Component,
        value: &[u8],
    ) -> CoreResult<EntitySet> {
        self.txn
            .get_value(&Prefix::index_record(self.partition, component, index, value))
    }

    fn update_index<F>(
        &mut self,
        component: Component,
        index: Component,
        value: &[u8],
        change: F,
    ) -> CoreResult<()>
    where
        F: FnOnce(&mut EntitySet) -> bool,
    {
        let key = Prefix::index_record(self.partition, component, index, value);
        let mut set: EntitySet = self.txn.get_value(&key)?;
        if change(&mut set) {
            self.txn.set(&key, &set.encode())?;
        }
        Ok(())
    }
}

fn contains_entry(entries: &[(Component, Vec<u8>)], index: Component, value: &[u8]) -> bool {
    entries.iter().any(|(i, v)| *i == index && v == value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::mock::MockTxn;
    use crate::kv::IndexCursor;

    const PART: Entity = Entity::new(100);
    const NAME: Component = Component::new(1);
    const BY_VALUE: Component = Component::new(1);

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Name(String);

    impl Encoder for Name {
        fn encode(&self) -> Vec<u8> {
            self.0.encode()
        }
    }

    impl Decoder for Name {
        fn decode(src: &[u8]) -> CoreResult<Self> {
            String::decode(src).map(Name)
        }
    }

    impl ComponentValue for Name {
        const COMPONENT: Component = NAME;

        fn index_values(&self) -> Vec<(Component, Vec<u8>)> {
            vec![(BY_VALUE, self.0.as_bytes().to_vec())]
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Note(Vec<String>);

    impl Encoder for Note {
        fn encode(&self) -> Vec<u8> {
            self.0.encode()
        }
    }

    impl Decoder for Note {
        fn decode(src: &[u8]) -> CoreResult<Self> {
            Vec::<String>::decode(src).map(Note)
        }
    }

    impl ComponentValue for Note {
        const COMPONENT: Component = Component::new(2);
    }

    fn name(s: &str) -> Name {
        Name(s.to_string())
    }

    #[test]
    fn set_then_get_slice() {
        let mut txn = MockTxn::default();
        let mut p = Partitioned::new(&mut txn, PART);
        let a = p.create_entity().unwrap();
        let b = p.create_entity().unwrap();
        assert_ne!(a, b);
        p.set_component(a, &name("alpha")).unwrap();

        let got: Vec<Name> = p.get_component_slice(&[a, b]).unwrap();
        assert_eq!(got, vec![name("alpha"), Name::default()]);
    }

    #[test]
    fn set_maintains_index_records() {
        let mut txn = MockTxn::default();
        let mut p = Partitioned::new(&mut txn, PART);
        let (a, b) = (Entity::new(1), Entity::new(2));
        p.set_component(a, &name("same")).unwrap();
        p.set_component(b, &name("same")).unwrap();
        assert_eq!(
            p.index_lookup(NAME, BY_VALUE, b"same").unwrap().as_slice(),
            &[a, b]
        );

        p.set_component(a, &name("other")).unwrap();
        assert_eq!(
            p.index_lookup(NAME, BY_VALUE, b"same").unwrap().as_slice(),
            &[b]
        );
        assert_eq!(
            p.index_lookup(NAME, BY_VALUE, b"other").unwrap().as_slice(),
            &[a]
        );
    }

    #[test]
    fn rewriting_same_value_keeps_index() {
        let mut txn = MockTxn::default();
        let mut p = Partitioned::new(&mut txn, PART);
        let a = Entity::new(5);
        p.set_component(a, &name("x")).unwrap();
        p.set_component(a, &name("x")).unwrap();
        assert_eq!(
            p.index_lookup(NAME, BY_VALUE, b"x").unwrap().as_slice(),
            &[a]
        );
    }

    #[test]
    fn index_scan_returns_entities_in_value_order() {
        let mut txn = MockTxn::default();
        let mut p = Partitioned::new(&mut txn, PART);
        p.set_component(Entity::new(1), &name("charlie")).unwrap();
        p.set_component(Entity::new(2), &name("alpha")).unwrap();
        p.set_component(Entity::new(3), &name("bravo")).unwrap();
        p.set_component(Entity::new(4), &name("alpha")).unwrap();
        p.set_component(Entity::new(1), &name("delta")).unwrap();

        let mut cursor = IndexCursor::new();
        let mut seen = Vec::new();
        loop {
            let page = p
                .entities_by_component_index(NAME, BY_VALUE, &mut cursor, 2)
                .unwrap();
            let done = page.len() < 2;
            seen.extend(page);
            if done {
                break;
            }
        }
        assert_eq!(
            seen,
            vec![Entity::new(2), Entity::new(4), Entity::new(3), Entity::new(1)]
        );
    }

    #[test]
    fn unindexed_component_writes_no_records() {
        let mut txn = MockTxn::default();
        let mut p = Partitioned::new(&mut txn, PART);
        let note = Note(vec!["first".into(), "second".into()]);
        p.set_component(Entity::new(9), &note).unwrap();
        assert_eq!(p.get_component::<Note>(Entity::new(9)).unwrap(), note);
        assert_eq!(txn.data.len(), 1);
    }

    #[test]
    fn all_component_entities_lists_values_not_index_records() {
        let mut txn = MockTxn::default();
        let mut p = Partitioned::new(&mut txn, PART);
        p.set_component(Entity::new(8), &name("h")).unwrap();
        p.set_component(Entity::new(3), &name("c")).unwrap();
        assert_eq!(
            p.all_component_entities(NAME, None, 0).unwrap(),
            vec![Entity::new(3), Entity::new(8)]
        );
    }

    #[test]
    fn reserved_entities_cannot_hold_values() {
        let mut txn = MockTxn::default();
        let mut p = Partitioned::new(&mut txn, PART);
        for e in [Entity::NONE, Entity::MAX] {
            assert!(matches!(
                p.set_component(e, &name("x")),
                Err(CoreError::InvalidFormat { .. })
            ));
        }
        assert!(p
            .index_lookup(NAME, BY_VALUE, b"x")
            .unwrap()
            .is_empty());
        assert!(p.txn().data.is_empty());
    }

    #[test]
    fn get_errors_propagate() {
        let mut txn = MockTxn {
            fail_gets: true,
            ..MockTxn::default()
        };
        let mut p = Partitioned::new(&mut txn, PART);
        assert!(p.set_component(Entity::new(1), &name("a")).is_err());
        assert!(p.get_component_slice::<Name>(&[Entity::new(1)]).is_err());
    }
}
