//! # notekv core
//!
//! An entity/component data model over any ordered byte key-value store.
//!
//! This crate provides:
//! - Order-preserving key encoding for [`Entity`] and [`Component`]
//! - [`EntitySet`], the sorted payload of index records
//! - [`Allocator`] for process-wide unique entities
//! - The [`Store`] / [`Txn`] / [`KvIterator`] contract backends implement
//! - [`Partitioned`] scans: by component, and by index with resumable
//!   [`IndexCursor`]s
//! - [`ComponentValue`] for typed values with automatically maintained indexes
//!
//! Backends live in `notekv_storage`; this crate performs no I/O of its own.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod allocator;
mod component;
mod entity;
mod entity_set;
mod error;
mod key;
mod kv;
mod partitioned;
mod value;

pub use allocator::Allocator;
pub use component::ComponentValue;
pub use entity::{Component, Entity, COMPONENT_LEN, ENTITY_LEN};
pub use entity_set::EntitySet;
pub use error::{CoreError, CoreResult};
pub use key::{Prefix, COMPONENT_PREFIX_LEN, INDEX_PREFIX_LEN, VALUE_KEY_LEN};
pub use kv::{Commit, IndexCursor, KvIterator, Store, Txn};
pub use partitioned::Partitioned;
pub use value::{Decoder, Encoder};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
