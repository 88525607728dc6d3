//! Value codecs.
//!
//! Anything stored as a key suffix or as a value implements [`Encoder`] and
//! [`Decoder`]. Decoders must accept empty input: a `get` on an absent key
//! hands the callback an empty slice, and that must decode to the type's
//! unset value instead of failing.

use crate::entity::Entity;
use crate::entity_set::EntitySet;
use crate::error::{CoreError, CoreResult};

/// Types that can be written into a key or value.
pub trait Encoder {
    /// Encodes `self` into a new byte vector.
    fn encode(&self) -> Vec<u8>;
}

/// Types that can be read back out of a key or value.
pub trait Decoder: Sized {
    /// Decodes a value from `src`.
    ///
    /// # Errors
    ///
    /// Returns an error if `src` is not a valid encoding.
    fn decode(src: &[u8]) -> CoreResult<Self>;
}

impl Encoder for Entity {
    fn encode(&self) -> Vec<u8> {
        Entity::encode(*self).to_vec()
    }
}

impl Decoder for Entity {
    fn decode(src: &[u8]) -> CoreResult<Self> {
        if src.is_empty() {
            return Ok(Entity::NONE);
        }
        Entity::decode(src)
    }
}

impl Encoder for EntitySet {
    fn encode(&self) -> Vec<u8> {
        EntitySet::encode(self)
    }
}

impl Decoder for EntitySet {
    fn decode(src: &[u8]) -> CoreResult<Self> {
        EntitySet::decode(src)
    }
}

impl Encoder for String {
    fn encode(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl Decoder for String {
    fn decode(src: &[u8]) -> CoreResult<Self> {
        String::from_utf8(src.to_vec()).map_err(|e| CoreError::invalid_format(e.to_string()))
    }
}

/// String lists are stored as JSON arrays.
impl Encoder for Vec<String> {
    fn encode(&self) -> Vec<u8> {
        // Serializing strings to JSON cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }
}

impl Decoder for Vec<String> {
    fn decode(src: &[u8]) -> CoreResult<Self> {
        if src.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_slice(src).map_err(|e| CoreError::invalid_format(e.to_string()))
    }
}
