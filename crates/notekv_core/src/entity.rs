//! Entity and component identifiers.
//!
//! Both are fixed-width, big-endian on the wire so that comparing encoded
//! bytes lexicographically gives the same answer as comparing the numbers.

use crate::error::{CoreError, CoreResult};
use std::fmt;

/// Encoded width of an [`Entity`].
pub const ENTITY_LEN: usize = 8;

/// Encoded width of a [`Component`].
pub const COMPONENT_LEN: usize = 2;

/// Opaque 64-bit identifier naming a record.
///
/// Entities carry no type information. They are normally produced by
/// [`crate::Txn::alloc`], which never hands out [`Entity::NONE`] or
/// [`Entity::MAX`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entity(pub u64);

impl Entity {
    /// The reserved "unset" entity.
    pub const NONE: Self = Self(0);

    /// The smallest entity that can be allocated.
    pub const MIN: Self = Self(1);

    /// The largest representable entity.
    ///
    /// Reserved as the end-of-scan marker: it is never allocated,
    /// [`crate::Partitioned::set_component`] rejects it, and component scans
    /// stop before it. A scan `start` equal to `MAX` is exhausted.
    pub const MAX: Self = Self(u64::MAX);

    /// Creates an entity from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns true for the reserved "unset" entity.
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Returns true for entities that cannot hold component values:
    /// [`Entity::NONE`] and [`Entity::MAX`].
    #[inline]
    #[must_use]
    pub const fn is_reserved(self) -> bool {
        self.0 == 0 || self.0 == u64::MAX
    }

    /// Returns the entity immediately after this one, saturating at
    /// [`Entity::MAX`].
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Writes the encoding into the first eight bytes of `dst`.
    ///
    /// # Panics
    ///
    /// Panics if `dst` is shorter than eight bytes.
    #[inline]
    pub fn encode_at(self, dst: &mut [u8]) {
        dst[..ENTITY_LEN].copy_from_slice(&self.0.to_be_bytes());
    }

    /// Encodes into eight big-endian bytes.
    #[inline]
    #[must_use]
    pub const fn encode(self) -> [u8; ENTITY_LEN] {
        self.0.to_be_bytes()
    }

    /// Decodes exactly eight big-endian bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidLength`] if `src` is not eight bytes long.
    pub fn decode(src: &[u8]) -> CoreResult<Self> {
        let bytes: [u8; ENTITY_LEN] = src
            .try_into()
            .map_err(|_| CoreError::invalid_length("entity", ENTITY_LEN, src.len()))?;
        Ok(Self(u64::from_be_bytes(bytes)))
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Entity {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Entity> for u64 {
    fn from(e: Entity) -> Self {
        e.0
    }
}

/// 16-bit tag naming a value slot (a record type) attached to entities.
///
/// Components are fixed constants agreed on by the application schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Component(pub u16);

impl Component {
    /// Creates a component from its raw tag.
    #[inline]
    #[must_use]
    pub const fn new(tag: u16) -> Self {
        Self(tag)
    }

    /// Returns the raw tag.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Writes the encoding into the first two bytes of `dst`.
    ///
    /// # Panics
    ///
    /// Panics if `dst` is shorter than two bytes.
    #[inline]
    pub fn encode_at(self, dst: &mut [u8]) {
        dst[..COMPONENT_LEN].copy_from_slice(&self.0.to_be_bytes());
    }

    /// Encodes into two big-endian bytes.
    #[inline]
    #[must_use]
    pub const fn encode(self) -> [u8; COMPONENT_LEN] {
        self.0.to_be_bytes()
    }

    /// Decodes exactly two big-endian bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidLength`] if `src` is not two bytes long.
    pub fn decode(src: &[u8]) -> CoreResult<Self> {
        let bytes: [u8; COMPONENT_LEN] = src
            .try_into()
            .map_err(|_| CoreError::invalid_length("component", COMPONENT_LEN, src.len()))?;
        Ok(Self(u16::from_be_bytes(bytes)))
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

impl From<u16> for Component {
    fn from(tag: u16) -> Self {
        Self(tag)
    }
}
