//! Process-wide unique entity allocation.

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::kv::{Commit, Store, Txn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Hands out entities that are unique across every transaction of a store.
///
/// There must be exactly one `Allocator` per store and key at a time, shared
/// by every transaction the store opens; [`Txn::alloc`] implementations
/// delegate here. A per-transaction allocator would hand out duplicates.
///
/// The high-water mark lives in memory and is advanced atomically, so
/// allocation never touches storage. It is persisted only by
/// [`save`](Self::save), normally at shutdown. On [`load`](Self::load) the
/// mark is raised to the current wall-clock time in nanoseconds, which keeps
/// identifiers from being reused when the last save was lost or the store was
/// restored from an older copy. That floor is a heuristic: it does not protect
/// against a clock that jumps backwards.
#[derive(Debug)]
pub struct Allocator {
    key: Vec<u8>,
    last: AtomicU64,
}

impl Allocator {
    /// Reads the high-water mark stored under `key` in `store`.
    ///
    /// An absent or empty value counts as zero. The in-memory mark starts at
    /// whichever is larger: the stored value or the wall clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the read transaction fails or the stored value is
    /// not a valid entity.
    pub fn load<S: Store + ?Sized>(store: &S, key: impl Into<Vec<u8>>) -> CoreResult<Self> {
        let key = key.into();
        let txn = store.new_txn(false)?;
        let stored: Entity = txn.get_value(&key)?;
        txn.discard();

        let floor = wall_clock_nanos();
        let last = stored.as_u64().max(floor);
        debug!(stored = stored.as_u64(), floor, last, "entity allocator loaded");

        Ok(Self {
            key,
            last: AtomicU64::new(last),
        })
    }

    /// Creates an allocator whose high-water mark is `last`, without reading
    /// storage.
    #[must_use]
    pub fn with_last(key: impl Into<Vec<u8>>, last: Entity) -> Self {
        Self {
            key: key.into(),
            last: AtomicU64::new(last.as_u64()),
        }
    }

    /// Returns a fresh entity.
    ///
    /// Safe to call concurrently; no two calls return the same value.
    /// [`Entity::MAX`] is never returned.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AllocatorExhausted`] once the mark reaches
    /// `Entity::MAX - 1`.
    pub fn alloc(&self) -> CoreResult<Entity> {
        self.last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                last.checked_add(1).filter(|next| *next < u64::MAX)
            })
            .map(|prev| Entity::new(prev + 1))
            .map_err(|_| CoreError::AllocatorExhausted)
    }

    /// Persists the current high-water mark under this allocator's key.
    ///
    /// Opens an update transaction on `store`; the caller must not hold one
    /// on the same thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the write transaction cannot be opened, written or
    /// committed.
    pub fn save<S: Store + ?Sized>(&self, store: &S) -> CoreResult<()> {
        let last = self.last();
        let mut txn = store.new_txn(true)?;
        txn.set(&self.key, &last.encode())?;
        txn.commit()?;
        debug!(last = last.as_u64(), "entity allocator saved");
        Ok(())
    }

    /// Returns the most recently allocated entity (or the starting mark).
    #[must_use]
    pub fn last(&self) -> Entity {
        Entity::new(self.last.load(Ordering::SeqCst))
    }

    /// Returns the storage key holding the persisted mark.
    #[must_use]
    pub fn key(&self) -> &[u8] {
        &self.key
    }
}

fn wall_clock_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::mock::MockStore;
    use std::collections::HashSet;

    const KEY: &[u8] = &[0];

    #[test]
    fn load_from_empty_store_uses_clock_floor() {
        let store = MockStore::default();
        let before = wall_clock_nanos();
        let a = Allocator::load(&store, KEY).unwrap();
        assert!(a.last().as_u64() >= before);
    }

    #[test]
    fn load_prefers_larger_stored_value() {
        let store = MockStore::default();
        let stored = Entity::new(u64::MAX / 2 + 7);
        store
            .data
            .borrow_mut()
            .insert(KEY.to_vec(), stored.encode().to_vec());
        let a = Allocator::load(&store, KEY).unwrap();
        assert_eq!(a.last(), stored);
        assert_eq!(a.alloc().unwrap(), stored.next());
    }

    #[test]
    fn load_rejects_malformed_counter() {
        let store = MockStore::default();
        store.data.borrow_mut().insert(KEY.to_vec(), vec![1, 2, 3]);
        assert!(matches!(
            Allocator::load(&store, KEY),
            Err(CoreError::InvalidLength { .. })
        ));
    }

    #[test]
    fn sequential_allocations_are_distinct() {
        let a = Allocator::with_last(KEY, Entity::new(10));
        let got: Vec<_> = (0..5).map(|_| a.alloc().unwrap().as_u64()).collect();
        assert_eq!(got, vec![11, 12, 13, 14, 15]);
    }

    #[test]
    fn concurrent_allocations_are_distinct() {
        let a = Allocator::with_last(KEY, Entity::MIN);
        let per_thread = 1000;
        let threads = 8;
        let all: Vec<Entity> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..threads)
                .map(|_| s.spawn(|| (0..per_thread).map(|_| a.alloc().unwrap()).collect::<Vec<_>>()))
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });
        let unique: HashSet<_> = all.iter().copied().collect();
        assert_eq!(unique.len(), per_thread * threads);
    }

    #[test]
    fn save_then_reload_continues_above_saved_values() {
        let store = MockStore::default();
        let a = Allocator::load(&store, KEY).unwrap();
        let issued: Vec<_> = (0..10).map(|_| a.alloc().unwrap()).collect();
        a.save(&store).unwrap();

        let b = Allocator::load(&store, KEY).unwrap();
        let next = b.alloc().unwrap();
        assert!(issued.iter().all(|e| next > *e));
    }

    #[test]
    fn saved_mark_is_stored_big_endian() {
        let store = MockStore::default();
        let a = Allocator::with_last(KEY, Entity::new(0x0102));
        a.save(&store).unwrap();
        assert_eq!(
            store.data.borrow().get(KEY).unwrap(),
            &vec![0, 0, 0, 0, 0, 0, 1, 2]
        );
    }

    #[test]
    fn exhaustion_is_reported() {
        let a = Allocator::with_last(KEY, Entity::new(u64::MAX - 2));
        assert_eq!(a.alloc().unwrap(), Entity::new(u64::MAX - 1));
        assert!(matches!(a.alloc(), Err(CoreError::AllocatorExhausted)));
        assert_eq!(a.last(), Entity::new(u64::MAX - 1));
    }
}
