//! Paginated scans over one partition.

use crate::entity::{Component, Entity};
use crate::entity_set::EntitySet;
use crate::error::CoreResult;
use crate::key::Prefix;
use crate::kv::{IndexCursor, KvIterator, Txn};

/// A transaction scoped to one partition.
///
/// The partition is an entity used purely as a namespace: every key this
/// type reads or writes starts with it. Page sizes of zero mean "no limit".
#[derive(Debug)]
pub struct Partitioned<'a, T: ?Sized> {
    pub(crate) txn: &'a mut T,
    pub(crate) partition: Entity,
}

impl<'a, T: Txn + ?Sized> Partitioned<'a, T> {
    /// Scopes `txn` to `partition`.
    pub fn new(txn: &'a mut T, partition: Entity) -> Self {
        Self { txn, partition }
    }

    /// Returns the partition entity.
    #[must_use]
    pub fn partition(&self) -> Entity {
        self.partition
    }

    /// Returns the underlying transaction.
    pub fn txn(&self) -> &T {
        &*self.txn
    }

    /// Returns the underlying transaction mutably.
    pub fn txn_mut(&mut self) -> &mut T {
        &mut *self.txn
    }

    /// Re-scopes the same transaction to another partition.
    pub fn with_partition(&mut self, partition: Entity) -> Partitioned<'_, T> {
        Partitioned {
            txn: &mut *self.txn,
            partition,
        }
    }

    /// Returns up to `n` entities that have a value for `component`, in
    /// ascending order, starting at the first entity not below `*start`.
    ///
    /// A missing or zero `start` begins at [`Entity::MIN`]. When `start` is
    /// given and the page is non-empty, it is moved to one past the last
    /// entity returned, so repeated calls with the same `start` walk the
    /// whole set without gaps or repeats. An empty page means the scan is
    /// finished. [`Entity::MAX`] is reserved: a value stored under it is
    /// never returned, and a `start` of `MAX` yields an empty page.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored key under the component is not a valid
    /// entity.
    pub fn all_component_entities(
        &self,
        component: Component,
        start: Option<&mut Entity>,
        n: usize,
    ) -> CoreResult<Vec<Entity>> {
        let limit = page_limit(n);
        let first = match start.as_deref() {
            Some(e) if !e.is_none() => *e,
            _ => Entity::MIN,
        };
        if first == Entity::MAX {
            return Ok(Vec::new());
        }

        let prefix = Prefix::component(self.partition, component);
        let mut iter = self.txn.prefix_iterator(&prefix);

        let mut es = Vec::new();
        iter.seek(&first.encode());
        while iter.valid() && es.len() < limit {
            let e = Entity::decode(iter.key())?;
            if e == Entity::MAX {
                break;
            }
            es.push(e);
            iter.next();
        }
        iter.discard();

        if let (Some(start), Some(last)) = (start, es.last()) {
            *start = last.next();
        }
        Ok(es)
    }

    /// Returns up to `n` entities from the records of index `index` on
    /// `component`, in index order, resuming from `cursor`.
    ///
    /// Each index record holds an [`EntitySet`] of every entity sharing one
    /// indexed value, so a page may end part way through a record. On return
    /// `cursor` names the last record read and the position reached inside
    /// it; passing it back continues exactly where this page stopped.
    ///
    /// A page shorter than `n` means the index is exhausted; the cursor then
    /// sits at the end of the last record. If the record the cursor names has
    /// been removed since the previous page, the scan continues from the
    /// start of the next record, or returns an empty page if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if a record does not decode as an entity set.
    pub fn entities_by_component_index(
        &self,
        component: Component,
        index: Component,
        cursor: &mut IndexCursor,
        n: usize,
    ) -> CoreResult<Vec<Entity>> {
        let limit = page_limit(n);
        let prefix = Prefix::index(self.partition, component, index);
        let mut iter = self.txn.prefix_iterator(&prefix);

        iter.seek(&cursor.key);
        if !iter.valid() {
            return Ok(Vec::new());
        }

        let resume = if cursor.key.is_empty() || iter.key() == cursor.key.as_slice() {
            cursor.offset
        } else {
            0
        };
        cursor.key.clear();
        cursor.key.extend_from_slice(iter.key());

        let mut es = Vec::new();
        let mut batch = read_batch(&iter)?;
        if let Some(rest) = batch.as_slice().get(resume..) {
            es.extend_from_slice(rest);
            if es.len() >= limit {
                cursor.offset = resume + limit;
                es.truncate(limit);
                return Ok(es);
            }
        }

        iter.next();
        while iter.valid() {
            batch = read_batch(&iter)?;
            es.extend_from_slice(batch.as_slice());
            cursor.key.clear();
            cursor.key.extend_from_slice(iter.key());
            if es.len() >= limit {
                cursor.offset = batch.len() - (es.len() - limit);
                es.truncate(limit);
                return Ok(es);
            }
            iter.next();
        }

        cursor.offset = batch.len();
        Ok(es)
    }
}

fn page_limit(n: usize) -> usize {
    if n == 0 {
        usize::MAX
    } else {
        n
    }
}

fn read_batch<I: KvIterator>(iter: &I) -> CoreResult<EntitySet> {
    let mut batch = EntitySet::new();
    iter.value(|bytes| {
        batch = EntitySet::decode(bytes)?;
        Ok(())
    })?;
    Ok(batch)
}
