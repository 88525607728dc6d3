//! The transaction and iterator contract every backend must satisfy.
//!
//! Everything else in this crate is written against these traits only, so any
//! ordered key-value engine that implements them can be swapped in.
//!
//! Releasing a transaction or iterator is expressed as `Drop`: both must give
//! back whatever they hold (snapshots, locks, file handles) when they go out
//! of scope, on every path. `discard` is the explicit spelling of the same
//! thing.

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::value::{Decoder, Encoder};

/// A database connection that hands out transactions.
pub trait Store {
    /// Transaction type produced by this store.
    type Txn<'a>: Commit
    where
        Self: 'a;

    /// Opens a new transaction. Only `update` transactions accept writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot start a transaction.
    fn new_txn(&self, update: bool) -> CoreResult<Self::Txn<'_>>;
}

/// Operations available inside a transaction.
pub trait Txn {
    /// Iterator type produced by [`prefix_iterator`](Self::prefix_iterator).
    type Iter<'a>: KvIterator
    where
        Self: 'a;

    /// Returns a fresh entity.
    ///
    /// Must never return the same value twice for one store until the space
    /// of entities is exhausted, including across concurrent transactions.
    /// Implementations delegate to the single [`crate::Allocator`] shared by
    /// every transaction of their store.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AllocatorExhausted`] once no values remain.
    fn alloc(&self) -> CoreResult<Entity>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ReadOnly`] for read-only transactions, or any
    /// backend failure.
    fn set(&mut self, key: &[u8], value: &[u8]) -> CoreResult<()>;

    /// Passes the value stored under `key` to `f`.
    ///
    /// An absent key is not an error: `f` is called with an empty slice.
    /// Whatever `f` returns is returned from `get`.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or any backend failure.
    fn get<F>(&self, key: &[u8], f: F) -> CoreResult<()>
    where
        F: FnOnce(&[u8]) -> CoreResult<()>;

    /// Returns an iterator over every pair whose key starts with `prefix`.
    ///
    /// Keys observed through the iterator are relative to `prefix`: for prefix
    /// `{1,2}` a stored key `{1,2,3,4}` is seen as `{3,4}`. The iterator
    /// starts out not [`valid`](KvIterator::valid); position it with
    /// [`seek`](KvIterator::seek).
    fn prefix_iterator(&self, prefix: &[u8]) -> Self::Iter<'_>;

    /// Decodes the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns decode or backend errors.
    fn get_value<V: Decoder>(&self, key: &[u8]) -> CoreResult<V> {
        let mut out = None;
        self.get(key, |bytes| {
            out = Some(V::decode(bytes)?);
            Ok(())
        })?;
        match out {
            Some(v) => Ok(v),
            None => V::decode(&[]),
        }
    }

    /// Encodes and stores `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns backend errors.
    fn set_value<V: Encoder + ?Sized>(&mut self, key: &[u8], value: &V) -> CoreResult<()> {
        self.set(key, &value.encode())
    }
}

/// Completion of a transaction.
pub trait Commit: Txn + Sized {
    /// Makes every write performed through this transaction durable and
    /// visible, then releases it.
    ///
    /// # Errors
    ///
    /// Returns backend errors such as I/O failures or conflicts. Committing a
    /// read-only transaction is a no-op.
    fn commit(self) -> CoreResult<()>;

    /// Abandons the transaction and its writes.
    fn discard(self) {
        drop(self);
    }
}

/// Cursor over the pairs of one prefix, in ascending key order.
pub trait KvIterator: Sized {
    /// Moves to `key`, or to the first key after it if `key` is absent.
    fn seek(&mut self, key: &[u8]);

    /// Moves to the next pair.
    fn next(&mut self);

    /// Returns true while positioned on a pair.
    fn valid(&self) -> bool;

    /// Returns the current key, relative to the iterator's prefix.
    ///
    /// Only meaningful while [`valid`](Self::valid); implementations may
    /// panic otherwise.
    fn key(&self) -> &[u8];

    /// Passes the current value to `f` and returns its result.
    ///
    /// Only meaningful while [`valid`](Self::valid); implementations may
    /// panic otherwise.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or any backend failure.
    fn value<F>(&self, f: F) -> CoreResult<()>
    where
        F: FnOnce(&[u8]) -> CoreResult<()>;

    /// Releases the iterator.
    fn discard(self) {
        drop(self);
    }
}

/// A resumption point inside an index scan.
///
/// `key` is the last index record visited (relative to the index prefix) and
/// `offset` the position inside that record's entity set. The default cursor
/// starts at the beginning of the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IndexCursor {
    /// Key of the index record the cursor points into.
    pub key: Vec<u8>,
    /// Position within that record's entity set.
    pub offset: usize,
}

impl IndexCursor {
    /// Creates a cursor at the start of an index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the cursor has not moved from the start.
    #[must_use]
    pub fn is_start(&self) -> bool {
        self.key.is_empty() && self.offset == 0
    }
}

/// Encoded as `offset` (8 bytes, big-endian) followed by the key bytes.
impl Encoder for IndexCursor {
    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.key.len());
        out.extend_from_slice(&(self.offset as u64).to_be_bytes());
        out.extend_from_slice(&self.key);
        out
    }
}

impl Decoder for IndexCursor {
    fn decode(src: &[u8]) -> CoreResult<Self> {
        if src.is_empty() {
            return Ok(Self::new());
        }
        let (head, key) = src
            .split_first_chunk::<8>()
            .ok_or_else(|| CoreError::invalid_length("index cursor", 8, src.len()))?;
        let offset = usize::try_from(u64::from_be_bytes(*head))
            .map_err(|_| CoreError::invalid_format("index cursor offset out of range"))?;
        Ok(Self {
            key: key.to_vec(),
            offset,
        })
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Minimal single-threaded backend used by this crate's own tests.

    use super::*;
    use std::cell::Cell;
    use std::collections::BTreeMap;
    use std::ops::Bound;

    #[derive(Debug, Default)]
    pub(crate) struct MockTxn {
        pub(crate) data: BTreeMap<Vec<u8>, Vec<u8>>,
        pub(crate) next: Cell<u64>,
        pub(crate) fail_gets: bool,
    }

    impl Txn for MockTxn {
        type Iter<'a> = MockIter<'a>;

        fn alloc(&self) -> CoreResult<Entity> {
            self.next.set(self.next.get() + 1);
            Ok(Entity::new(self.next.get()))
        }

        fn set(&mut self, key: &[u8], value: &[u8]) -> CoreResult<()> {
            self.data.insert(key.to_vec(), value.to_vec());
            Ok(())
        }

        fn get<F>(&self, key: &[u8], f: F) -> CoreResult<()>
        where
            F: FnOnce(&[u8]) -> CoreResult<()>,
        {
            if self.fail_gets {
                return Err(CoreError::backend(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "injected",
                )));
            }
            f(self.data.get(key).map_or(&[][..], Vec::as_slice))
        }

        fn prefix_iterator(&self, prefix: &[u8]) -> MockIter<'_> {
            MockIter {
                data: &self.data,
                prefix: prefix.to_vec(),
                current: None,
            }
        }
    }

    /// A store whose transactions work on a private copy and write it back
    /// on commit.
    #[derive(Debug, Default)]
    pub(crate) struct MockStore {
        pub(crate) data: std::cell::RefCell<BTreeMap<Vec<u8>, Vec<u8>>>,
    }

    pub(crate) struct MockStoreTxn<'a> {
        store: &'a MockStore,
        inner: MockTxn,
        update: bool,
    }

    impl Store for MockStore {
        type Txn<'a> = MockStoreTxn<'a>;

        fn new_txn(&self, update: bool) -> CoreResult<MockStoreTxn<'_>> {
            Ok(MockStoreTxn {
                store: self,
                inner: MockTxn {
                    data: self.data.borrow().clone(),
                    ..MockTxn::default()
                },
                update,
            })
        }
    }

    impl Txn for MockStoreTxn<'_> {
        type Iter<'b>
            = MockIter<'b>
        where
            Self: 'b;

        fn alloc(&self) -> CoreResult<Entity> {
            self.inner.alloc()
        }

        fn set(&mut self, key: &[u8], value: &[u8]) -> CoreResult<()> {
            if !self.update {
                return Err(CoreError::ReadOnly);
            }
            self.inner.set(key, value)
        }

        fn get<F>(&self, key: &[u8], f: F) -> CoreResult<()>
        where
            F: FnOnce(&[u8]) -> CoreResult<()>,
        {
            self.inner.get(key, f)
        }

        fn prefix_iterator(&self, prefix: &[u8]) -> MockIter<'_> {
            self.inner.prefix_iterator(prefix)
        }
    }

    impl Commit for MockStoreTxn<'_> {
        fn commit(self) -> CoreResult<()> {
            if self.update {
                *self.store.data.borrow_mut() = self.inner.data;
            }
            Ok(())
        }
    }

    pub(crate) struct MockIter<'a> {
        data: &'a BTreeMap<Vec<u8>, Vec<u8>>,
        prefix: Vec<u8>,
        current: Option<(&'a [u8], &'a [u8])>,
    }

    impl MockIter<'_> {
        fn land(&mut self, from: Bound<Vec<u8>>) {
            let data = self.data;
            self.current = data
                .range((from, Bound::Unbounded))
                .next()
                .filter(|(k, _)| k.starts_with(&self.prefix))
                .map(|(k, v)| (k.as_slice(), v.as_slice()));
        }
    }

    impl KvIterator for MockIter<'_> {
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

        fn key(&self) -> &[u8] {
            let (k, _) = self.current.expect("iterator is not valid");
            &k[self.prefix.len()..]
        }

        fn value<F>(&self, f: F) -> CoreResult<()>
        where
            F: FnOnce(&[u8]) -> CoreResult<()>,
        {
            let (_, v) = self.current.expect("iterator is not valid");
            f(v)
        }
    }
}
