//! Test fixtures and store helpers.
//!
//! Provides temporary stores, seeding helpers that write component values
//! and index records directly, and drivers that drain a paginated scan page
//! by page the way a client would.

use notekv_core::{
    Commit, Component, CoreResult, Entity, EntitySet, IndexCursor, Partitioned, Prefix, Store,
    Txn,
};
use notekv_storage::{Config, FileStore, MemoryStore};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A file store in a temporary directory, removed on drop.
pub struct TestFileStore {
    /// The store instance.
    pub store: FileStore,
    path: PathBuf,
    config: Config,
    /// Kept alive to prevent cleanup.
    _temp_dir: TempDir,
}

impl TestFileStore {
    /// Creates a file store that skips syncing on commit.
    pub fn new() -> Self {
        Self::with_config(Config::default().sync_on_commit(false))
    }

    /// Creates a file store with `config`.
    pub fn with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("store.nkv");
        let store = FileStore::open(&path, config.clone()).expect("Failed to open file store");
        Self {
            store,
            path,
            config,
            _temp_dir: temp_dir,
        }
    }

    /// Returns the path of the commit log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Closes and reopens the store, as after a process restart.
    pub fn reopen(self) -> Self {
        let Self {
            store,
            path,
            config,
            _temp_dir,
        } = self;
        store.close().expect("Failed to close file store");
        let store = FileStore::open(&path, config.clone()).expect("Failed to reopen file store");
        Self {
            store,
            path,
            config,
            _temp_dir,
        }
    }
}

impl Default for TestFileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestFileStore {
    type Target = FileStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Creates an empty in-memory store.
pub fn memory_store() -> MemoryStore {
    MemoryStore::new().expect("Failed to open memory store")
}

/// Runs a test with a temporary in-memory store.
pub fn with_memory_store<F, R>(f: F) -> R
where
    F: FnOnce(&MemoryStore) -> R,
{
    let store = memory_store();
    f(&store)
}

/// Runs a test with a temporary file store.
pub fn with_file_store<F, R>(f: F) -> R
where
    F: FnOnce(&FileStore, &Path) -> R,
{
    let test_store = TestFileStore::new();
    f(&test_store.store, test_store.path())
}

/// Runs `f` inside one update transaction and commits it.
pub fn write<'s, S, F, R>(store: &'s S, f: F) -> CoreResult<R>
where
    S: Store,
    F: FnOnce(&mut S::Txn<'s>) -> CoreResult<R>,
{
    let mut txn = store.new_txn(true)?;
    let out = f(&mut txn)?;
    txn.commit()?;
    Ok(out)
}

/// Stores an empty value for each entity under `component`, making them
/// visible to [`Partitioned::all_component_entities`].
pub fn seed_component<S: Store>(
    store: &S,
    partition: Entity,
    component: Component,
    entities: &[Entity],
) -> CoreResult<()> {
    write(store, |txn| {
        for e in entities {
            txn.set(&Prefix::value(partition, component, *e), &[])?;
        }
        Ok(())
    })
}

/// Writes each `(value, set)` pair as an index record of `index` on
/// `component`.
pub fn seed_index<S: Store>(
    store: &S,
    partition: Entity,
    component: Component,
    index: Component,
    records: &[(Vec<u8>, EntitySet)],
) -> CoreResult<()> {
    write(store, |txn| {
        for (value, set) in records {
            let key = Prefix::index_record(partition, component, index, value);
            txn.set_value(&key, set)?;
        }
        Ok(())
    })
}

/// Drains a component scan `n` entities at a time, opening a fresh read
/// transaction for every page.
pub fn collect_component_pages<S: Store>(
    store: &S,
    partition: Entity,
    component: Component,
    n: usize,
) -> CoreResult<Vec<Vec<Entity>>> {
    let mut start = Entity::NONE;
    let mut pages = Vec::new();
    loop {
        let mut txn = store.new_txn(false)?;
        let page = Partitioned::new(&mut txn, partition).all_component_entities(
            component,
            Some(&mut start),
            n,
        )?;
        if page.is_empty() {
            return Ok(pages);
        }
        pages.push(page);
        if n == 0 {
            return Ok(pages);
        }
    }
}

/// Drains an index scan `n` entities at a time, opening a fresh read
/// transaction for every page. Stops after the first short page.
pub fn collect_index_pages<S: Store>(
    store: &S,
    partition: Entity,
    component: Component,
    index: Component,
    n: usize,
) -> CoreResult<Vec<Vec<Entity>>> {
    let mut cursor = IndexCursor::new();
    let mut pages = Vec::new();
    loop {
        let mut txn = store.new_txn(false)?;
        let page = Partitioned::new(&mut txn, partition).entities_by_component_index(
            component,
            index,
            &mut cursor,
            n,
        )?;
        let done = n == 0 || page.len() < n;
        if !page.is_empty() {
            pages.push(page);
        }
        if done {
            return Ok(pages);
        }
    }
}

/// Ready-made store layouts.
pub mod scenarios {
    use super::*;

    /// Partition used by the scenarios.
    pub const PARTITION: Entity = Entity::new(7);
    /// Component used by the scenarios.
    pub const COMPONENT: Component = Component::new(3);
    /// Index used by the scenarios.
    pub const INDEX: Component = Component::new(1);

    /// A store whose [`COMPONENT`] holds entities 1, 3, 4, 9 and 20.
    pub fn sparse_component_store() -> MemoryStore {
        let store = memory_store();
        let entities: Vec<Entity> = [1, 3, 4, 9, 20].into_iter().map(Entity::new).collect();
        seed_component(&store, PARTITION, COMPONENT, &entities).expect("Failed to seed");
        store
    }

    /// A store whose [`INDEX`] has records `A = {1, 2}` and `B = {3}`.
    pub fn two_record_index_store() -> MemoryStore {
        let store = memory_store();
        let records = vec![
            (b"A".to_vec(), EntitySet::from(vec![Entity::new(1), Entity::new(2)])),
            (b"B".to_vec(), EntitySet::from(vec![Entity::new(3)])),
        ];
        seed_index(&store, PARTITION, COMPONENT, INDEX, &records).expect("Failed to seed");
        store
    }
}
