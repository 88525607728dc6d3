//! File-backed store.

use crate::commit_log::{self, CommitLog};
use crate::config::Config;
use crate::engine::{Engine, StoreTxn};
use crate::error::StorageError;
use fs2::FileExt;
use notekv_core::{Allocator, CoreResult, Entity, Store};
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A store persisted as an append-only commit log.
///
/// The whole map is held in memory and rebuilt from the log on open. Each
/// committed update transaction appends one checksummed record; with
/// [`Config::sync_on_commit`] the record is synced before the commit
/// returns.
///
/// The log file is locked exclusively for as long as the store is open, so a
/// second open of the same path fails with [`StorageError::Locked`] until
/// this one is dropped.
///
/// # Example
///
/// ```no_run
/// use notekv_core::{Commit, Store, Txn};
/// use notekv_storage::{Config, FileStore};
///
/// let store = FileStore::open("notes.nkv", Config::default()).unwrap();
/// let mut txn = store.new_txn(true).unwrap();
/// txn.set(b"key", b"value").unwrap();
/// txn.commit().unwrap();
/// store.close().unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    engine: Engine,
    path: PathBuf,
    opened_mark: Entity,
    closed: bool,
}

impl FileStore {
    /// Opens the store at `path`, replaying its commit log.
    ///
    /// A record cut short at the end of the log is discarded and the file
    /// truncated to the last complete record.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file doesn't exist and `create_if_missing` is false
    /// - Another process holds the store
    /// - A complete record is corrupt or fails its checksum
    /// - The persisted allocator mark is malformed
    pub fn open(path: impl AsRef<Path>, config: Config) -> CoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            if !config.create_if_missing {
                return Err(StorageError::NotFound(path).into());
            }
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(StorageError::from)?;
            }
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(StorageError::from)?;

        // Non-blocking
        if file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked(path).into());
        }

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(StorageError::from)?;
        let replay = commit_log::replay(&bytes)?;
        debug!(
            records = replay.records,
            keys = replay.tree.len(),
            bytes = replay.valid_len,
            "commit log replayed"
        );

        if replay.valid_len < bytes.len() as u64 {
            warn!(
                path = %path.display(),
                dropped = bytes.len() as u64 - replay.valid_len,
                "discarding incomplete record at end of commit log"
            );
            file.set_len(replay.valid_len).map_err(StorageError::from)?;
            file.sync_all().map_err(StorageError::from)?;
        }

        let log = CommitLog::new(file, replay.valid_len, config.sync_on_commit);
        let mut store = Self {
            engine: Engine::new(replay.tree, Some(log)),
            path,
            opened_mark: Entity::NONE,
            closed: false,
        };
        let allocator = Allocator::load(&store, config.allocator_key)?;
        store.opened_mark = allocator.last();
        store.engine.install_allocator(allocator);

        info!(path = %store.path.display(), keys = store.len(), "file store opened");
        Ok(store)
    }

    /// Returns the path of the commit log.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
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

    /// Saves the allocator and closes the store, releasing the file lock.
    ///
    /// Nothing is written if no entity was allocated since open: the
    /// wall-clock floor is recomputed on the next open anyway.
    ///
    /// # Errors
    ///
    /// Returns an error if the allocator cannot be saved. The lock is
    /// released either way.
    pub fn close(mut self) -> CoreResult<()> {
        self.closed = true;
        if self.allocated_since_open() {
            self.save_allocator()?;
        }
        info!(path = %self.path.display(), keys = self.len(), "file store closed");
        Ok(())
    }

    fn allocated_since_open(&self) -> bool {
        self.engine
            .allocator()
            .is_ok_and(|a| a.last() != self.opened_mark)
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

    /// Size of the commit log in bytes.
    #[must_use]
    pub fn log_size(&self) -> u64 {
        self.engine.log().map_or(0, CommitLog::size)
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

impl Store for FileStore {
    type Txn<'a> = StoreTxn<'a>;

    fn new_txn(&self, update: bool) -> CoreResult<StoreTxn<'_>> {
        Ok(self.engine.begin(update))
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        if self.closed || !self.allocated_since_open() {
            return;
        }
        if let Err(err) = self.save_allocator() {
            warn!(path = %self.path.display(), error = %err, "failed to save allocator on drop");
        }
    }
}
