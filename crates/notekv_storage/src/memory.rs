//! In-memory store for tests and ephemeral data.

use crate::config::Config;
use crate::engine::{Engine, StoreTxn, Tree};
use notekv_core::{Allocator, CoreResult, Store};
use std::io::{self, Write};
use tracing::info;

/// A store that keeps everything in memory.
///
/// Suitable for:
/// - Unit and integration tests
/// - Scratch data that doesn't need to outlive the process
///
/// Contents are lost on drop. [`entries`](Self::entries) and
/// [`with_data`](Self::with_data) move them between instances, which is how
/// tests simulate a restart.
///
/// # Example
///
/// ```rust
/// use notekv_core::{Commit, Store, Txn};
/// use notekv_storage::MemoryStore;
///
/// let store = MemoryStore::new().unwrap();
/// let mut txn = store.new_txn(true).unwrap();
/// txn.set(b"key", b"value").unwrap();
/// txn.commit().unwrap();
/// assert_eq!(store.len(), 1);
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    engine: Engine,
}

impl MemoryStore {
    /// Creates an empty store with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the allocator cannot be loaded.
    pub fn new() -> CoreResult<Self> {
        Self::with_config(&Config::default())
    }

    /// Creates an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the allocator cannot be loaded.
    pub fn with_config(config: &Config) -> CoreResult<Self> {
        Self::with_data(Tree::new(), config)
    }

    /// Creates a store holding `entries`, as if reopened after a restart.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted allocator mark is malformed.
    pub fn with_data<I>(entries: I, config: &Config) -> CoreResult<Self>
    where
        I: IntoIterator<Item = (Vec<u8>, Vec<u8>)>,
    {
        let store = Self {
            engine: Engine::new(entries.into_iter().collect(), None),
        };
        let allocator = Allocator::load(&store, config.allocator_key.clone())?;
        store.engine.install_allocator(allocator);
        Ok(store)
    }

    /// Returns the allocator shared by this store's transactions.
    ///
    /// # Errors
    ///
    /// Returns an error if the store has no allocator.
    pub fn allocator(&self) -> CoreResult<&Allocator> {
        Ok(self.engine.allocator()?)
    }

    /// Persists the allocator's high-water mark into the store.
    ///
    /// This opens its own update transaction, so calling it while the same
    /// thread holds one deadlocks.
    ///
    /// # Errors
    ///
    /// Returns an error if the write transaction fails.
    pub fn save_allocator(&self) -> CoreResult<()> {
        self.engine.allocator()?.save(self)
    }

    /// Saves the allocator and releases the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the allocator cannot be saved.
    pub fn close(self) -> CoreResult<()> {
        self.save_allocator()?;
        info!(keys = self.len(), "memory store closed");
        Ok(())
    }

    /// Returns a copy of every committed pair, in key order.
    #[must_use]
    pub fn entries(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.engine
            .snapshot()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Number of committed keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.engine.len()
    }

    /// Returns true if nothing has been committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes every committed pair as `hex(key)\thex(value)` lines followed
    /// by a `N keys` trailer. Returns the number of pairs.
    ///
    /// # Errors
    ///
    /// Returns any error from `out`.
    pub fn dump<W: Write>(&self, out: &mut W) -> io::Result<usize> {
        self.engine.dump(out)
    }
}

impl Store for MemoryStore {
    type Txn<'a> = StoreTxn<'a>;

    fn new_txn(&self, update: bool) -> CoreResult<StoreTxn<'_>> {
        Ok(self.engine.begin(update))
    }
}
