//! Composite key construction.
//!
//! Every key under a partition starts with the same ten bytes:
//!
//! ```text
//! partition (8) | component (2)                                  component prefix
//! partition (8) | component (2) | entity (8)                     direct value
//! partition (8) | component (2) | 0 (8) | index (2) | value..   index record
//! ```
//!
//! Fields are fixed width, so concatenation needs no separators and a prefix
//! scan over `partition | component` visits entities in numeric order.

use crate::entity::{Component, Entity, COMPONENT_LEN, ENTITY_LEN};
use std::ops::Deref;

/// Length of the `partition | component` prefix.
pub const COMPONENT_PREFIX_LEN: usize = ENTITY_LEN + COMPONENT_LEN;

/// Length of a direct value key.
pub const VALUE_KEY_LEN: usize = COMPONENT_PREFIX_LEN + ENTITY_LEN;

/// Length of the `partition | component | 0 | index` prefix.
pub const INDEX_PREFIX_LEN: usize = VALUE_KEY_LEN + COMPONENT_LEN;

/// A byte key built by concatenating fixed-width fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Prefix(Vec<u8>);

impl Prefix {
    /// Creates an empty prefix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `partition | component`: the prefix shared by every key of one
    /// component within one partition.
    #[must_use]
    pub fn component(partition: Entity, component: Component) -> Self {
        Self::new().concat_entity_component(partition, component)
    }

    /// `partition | component | entity`: the key of a direct value.
    #[must_use]
    pub fn value(partition: Entity, component: Component, entity: Entity) -> Self {
        Self::component(partition, component).concat_entity(entity)
    }

    /// `partition | component | 0 | index`: the prefix of every record of one
    /// index.
    #[must_use]
    pub fn index(partition: Entity, component: Component, index: Component) -> Self {
        Self::component(partition, component).concat_entity_component(Entity::NONE, index)
    }

    /// `partition | component | 0 | index | value`: the key of the index
    /// record holding every entity whose indexed value encodes to `value`.
    #[must_use]
    pub fn index_record(
        partition: Entity,
        component: Component,
        index: Component,
        value: &[u8],
    ) -> Self {
        Self::component(partition, component).concat_entity_component_bytes(
            Entity::NONE,
            index,
            value,
        )
    }

    /// Returns a new prefix holding `self` followed by `e`.
    #[must_use]
    pub fn concat_entity(&self, e: Entity) -> Self {
        let mut b = Vec::with_capacity(self.0.len() + ENTITY_LEN);
        b.extend_from_slice(&self.0);
        b.extend_from_slice(&e.encode());
        Self(b)
    }

    /// Returns a new prefix holding `self` followed by `e` and `c`.
    #[must_use]
    pub fn concat_entity_component(&self, e: Entity, c: Component) -> Self {
        let mut b = Vec::with_capacity(self.0.len() + ENTITY_LEN + COMPONENT_LEN);
        b.extend_from_slice(&self.0);
        b.extend_from_slice(&e.encode());
        b.extend_from_slice(&c.encode());
        Self(b)
    }

    /// Returns a new prefix holding `self` followed by `e`, `c` and `bytes`.
    #[must_use]
    pub fn concat_entity_component_bytes(&self, e: Entity, c: Component, bytes: &[u8]) -> Self {
        let mut b = Vec::with_capacity(self.0.len() + ENTITY_LEN + COMPONENT_LEN + bytes.len());
        b.extend_from_slice(&self.0);
        b.extend_from_slice(&e.encode());
        b.extend_from_slice(&c.encode());
        b.extend_from_slice(bytes);
        Self(b)
    }

    /// Appends `c` in place and returns the result.
    #[must_use]
    pub fn append_component(mut self, c: Component) -> Self {
        self.0.extend_from_slice(&c.encode());
        self
    }

    /// Returns the key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the prefix, returning the key bytes.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl Deref for Prefix {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Prefix {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Prefix {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<Prefix> for Vec<u8> {
    fn from(p: Prefix) -> Self {
        p.0
    }
}
