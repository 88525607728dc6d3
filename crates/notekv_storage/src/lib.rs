//! # notekv storage
//!
//! Backends implementing the `notekv_core` transaction contract.
//!
//! Both stores keep an ordered map in memory behind copy-on-write snapshots:
//! read transactions never block, and update transactions are serialized by
//! a single writer lock. Each store owns exactly one
//! [`Allocator`](notekv_core::Allocator), shared by all of its transactions.
//!
//! ## Available Stores
//!
//! - [`MemoryStore`] - For testing and ephemeral data
//! - [`FileStore`] - Persistent, backed by a checksummed append-only commit log
//!
//! ## Example
//!
//! ```rust
//! use notekv_core::{Commit, Component, Entity, Partitioned, Prefix, Store, Txn};
//! use notekv_storage::MemoryStore;
//!
//! let store = MemoryStore::new().unwrap();
//! let notes = Entity::new(1);
//! let title = Component::new(1);
//!
//! let mut txn = store.new_txn(true).unwrap();
//! let topic = txn.alloc().unwrap();
//! txn.set_value(&Prefix::value(notes, title, topic), &"Rust".to_string())
//!     .unwrap();
//! txn.commit().unwrap();
//!
//! let mut txn = store.new_txn(false).unwrap();
//! let found = Partitioned::new(&mut txn, notes)
//!     .all_component_entities(title, None, 0)
//!     .unwrap();
//! assert_eq!(found, vec![topic]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod commit_log;
mod config;
mod engine;
mod error;
mod file;
mod memory;

pub use commit_log::{compute_crc32, CRC_LEN, HEADER_LEN, LOG_MAGIC, LOG_VERSION};
pub use config::{Config, DEFAULT_ALLOCATOR_KEY};
pub use engine::{StoreIter, StoreTxn};
pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use memory::MemoryStore;
