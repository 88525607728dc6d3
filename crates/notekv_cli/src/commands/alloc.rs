//! Alloc command implementation.

use super::open_store;
use notekv_core::{Entity, Store, Txn};
use std::path::Path;

/// Allocates `count` entities from the store at `path`, prints them one per
/// line, and persists the allocator.
pub fn run(path: &Path, count: usize) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path)?;
    let entities = allocate(&store, count)?;
    for e in &entities {
        println!("{e}");
    }
    store.close()?;
    Ok(())
}

fn allocate<S: Store>(store: &S, count: usize) -> notekv_core::CoreResult<Vec<Entity>> {
    let txn = store.new_txn(false)?;
    (0..count).map(|_| txn.alloc()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notekv_storage::{Config, FileStore};

    #[test]
    fn allocations_persist_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.nkv");
        FileStore::open(&path, Config::default()).unwrap().close().unwrap();

        let store = open_store(&path).unwrap();
        let first = allocate(&store, 3).unwrap();
        store.close().unwrap();

        let store = open_store(&path).unwrap();
        let second = allocate(&store, 1).unwrap();
        assert!(first.windows(2).all(|w| w[0] < w[1]));
        assert!(second[0] > first[2]);
    }
}
