//! The ordered map shared by both stores.
//!
//! Committed state is an `Arc<Tree>` snapshot. A read transaction pins the
//! current snapshot and never blocks. An update transaction takes the single
//! writer lock and collects its writes in an overlay read through ahead of
//! the snapshot. On commit the overlay is appended to the commit log (if
//! any) and then merged into the published tree, which is copied only if a
//! reader still pins it. Dropping a transaction without committing throws
//! its writes away.
//!
//! Opening an update transaction while the same thread already holds one
//! deadlocks.

use crate::error::{StorageError, StorageResult};
use crate::commit_log::CommitLog;
use notekv_core::{Allocator, Commit, CoreError, CoreResult, Entity, KvIterator, Txn};
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::ops::Bound;
use std::sync::{Arc, OnceLock};

/// Ordered key-value contents of a store.
pub(crate) type Tree = BTreeMap<Vec<u8>, Vec<u8>>;

#[derive(Debug)]
pub(crate) struct Engine {
    tree: RwLock<Arc<Tree>>,
    writer: Mutex<()>,
    allocator: OnceLock<Allocator>,
    log: Option<CommitLog>,
}

impl Engine {
    pub(crate) fn new(tree: Tree, log: Option<CommitLog>) -> Self {
        Self {
            tree: RwLock::new(Arc::new(tree)),
            writer: Mutex::new(()),
            allocator: OnceLock::new(),
            log,
        }
    }

    pub(crate) fn begin(&self, update: bool) -> StoreTxn<'_> {
        // Take the writer lock before the snapshot so no commit slips in
        // between.
        let writer = update.then(|| self.writer.lock());
        let view = Arc::clone(&*self.tree.read());
        StoreTxn {
            engine: self,
            view,
            changes: Tree::new(),
            writer,
        }
    }

    /// Installs the store's allocator. Only the first call has any effect.
    pub(crate) fn install_allocator(&self, allocator: Allocator) {
        let _ = self.allocator.set(allocator);
    }

    pub(crate) fn allocator(&self) -> StorageResult<&Allocator> {
        self.allocator.get().ok_or(StorageError::Closed)
    }

    pub(crate) fn log(&self) -> Option<&CommitLog> {
        self.log.as_ref()
    }

    pub(crate) fn snapshot(&self) -> Arc<Tree> {
        Arc::clone(&*self.tree.read())
    }

    pub(crate) fn len(&self) -> usize {
        self.tree.read().len()
    }

    /// Writes every pair as `hex(key)\thex(value)`, then a `N keys` trailer.
    pub(crate) fn dump<W: Write>(&self, out: &mut W) -> io::Result<usize> {
        let tree = self.snapshot();
        for (key, value) in tree.iter() {
            writeln!(out, "{}\t{}", Hex(key), Hex(value))?;
        }
        writeln!(out, "{} keys", tree.len())?;
        Ok(tree.len())
    }
}

struct Hex<'a>(&'a [u8]);

impl fmt::Display for Hex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// A transaction on a [`MemoryStore`](crate::MemoryStore) or
/// [`FileStore`](crate::FileStore).
pub struct StoreTxn<'a> {
    engine: &'a Engine,
    view: Arc<Tree>,
    changes: Tree,
    writer: Option<MutexGuard<'a, ()>>,
}

impl StoreTxn<'_> {
    /// Returns true if this transaction accepts writes.
    #[must_use]
    pub fn is_update(&self) -> bool {
        self.writer.is_some()
    }
}

impl fmt::Debug for StoreTxn<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreTxn")
            .field("update", &self.is_update())
            .field("keys", &self.view.len())
            .field("pending", &self.changes.len())
            .finish()
    }
}

impl Txn for StoreTxn<'_> {
    type Iter<'b>
        = StoreIter<'b>
    where
        Self: 'b;

    fn alloc(&self) -> CoreResult<Entity> {
        self.engine.allocator()?.alloc()
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> CoreResult<()> {
        if !self.is_update() {
            return Err(CoreError::ReadOnly);
        }
        self.changes.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get<F>(&self, key: &[u8], f: F) -> CoreResult<()>
    where
        F: FnOnce(&[u8]) -> CoreResult<()>,
    {
        let value = self.changes.get(key).or_else(|| self.view.get(key));
        f(value.map_or(&[][..], Vec::as_slice))
    }

    fn prefix_iterator(&self, prefix: &[u8]) -> StoreIter<'_> {
        StoreIter {
            base: &self.view,
            overlay: &self.changes,
            prefix: prefix.to_vec(),
            current: None,
        }
    }
}

impl Commit for StoreTxn<'_> {
    fn commit(self) -> CoreResult<()> {
        let Self {
            engine,
            view,
            changes,
            writer,
        } = self;
        if writer.is_none() || changes.is_empty() {
            return Ok(());
        }
        if let Some(log) = engine.log() {
            log.append(&changes)?;
        }
        // Unpin our snapshot so the merge can happen in place.
        drop(view);
        let mut published = engine.tree.write();
        Arc::make_mut(&mut *published).extend(changes);
        drop(published);
        drop(writer);
        Ok(())
    }
}

/// Prefix-scoped iterator over a transaction's view: its snapshot with its
/// own uncommitted writes laid over it.
#[derive(Debug)]
pub struct StoreIter<'a> {
    base: &'a Tree,
    overlay: &'a Tree,
    prefix: Vec<u8>,
    current: Option<(&'a [u8], &'a [u8])>,
}

impl<'a> StoreIter<'a> {
    fn land(&mut self, from: Bound<Vec<u8>>) {
        let first = |tree: &'a Tree| tree.range((from.clone(), Bound::Unbounded)).next();
        let next = match (first(self.base), first(self.overlay)) {
            (Some(b), Some(o)) if b.0 < o.0 => Some(b),
            (b, o) => o.or(b),
        };
        self.current = next
            .filter(|(k, _)| k.starts_with(&self.prefix))
            .map(|(k, v)| (k.as_slice(), v.as_slice()));
    }
}

impl KvIterator for StoreIter<'_> {
    fn seek(&mut self, key: &[u8]) {
        let mut full = self.prefix.clone();
        full.extend_from_slice(key);
        self.land(Bound::Included(full));
    }

    fn next(&mut self) {
        if let Some((k, _)) = self.current {
            self.land(Bound::Excluded(k.to_vec()));
        }
    }

    fn valid(&self) -> bool {
        self.current.is_some()
    }

    /// Empty when the iterator is not valid.
    fn key(&self) -> &[u8] {
        self.current
            .map_or(&[][..], |(k, _)| &k[self.prefix.len()..])
    }

    /// Passes an empty slice when the iterator is not valid.
    fn value<F>(&self, f: F) -> CoreResult<()>
    where
        F: FnOnce(&[u8]) -> CoreResult<()>,
    {
        f(self.current.map_or(&[][..], |(_, v)| v))
    }
}
