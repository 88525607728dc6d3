//! Cross-crate integration test helpers.
//!
//! [`ScanHarness`] seeds a store through the real transaction contract, keeps
//! a model of what it wrote, and checks that paginated scans reproduce the
//! model exactly. It works against any [`Store`], so the same checks run on
//! every backend.

use crate::fixtures::{collect_component_pages, collect_index_pages, seed_component, seed_index};
use notekv_core::{Component, CoreResult, Entity, EntitySet, Store};
use std::collections::{BTreeMap, BTreeSet};

/// A store plus a model of the component values and index records written
/// through it.
pub struct ScanHarness<'s, S: Store> {
    store: &'s S,
    partition: Entity,
    component: Component,
    index: Component,
    entities: BTreeSet<Entity>,
    records: BTreeMap<Vec<u8>, EntitySet>,
}

impl<'s, S: Store> ScanHarness<'s, S> {
    /// Creates a harness scoped to one partition, component and index.
    pub fn new(store: &'s S, partition: Entity, component: Component, index: Component) -> Self {
        Self {
            store,
            partition,
            component,
            index,
            entities: BTreeSet::new(),
            records: BTreeMap::new(),
        }
    }

    /// Stores values for `entities` and tracks them.
    pub fn add_entities(&mut self, entities: &[Entity]) -> CoreResult<()> {
        seed_component(self.store, self.partition, self.component, entities)?;
        self.entities.extend(entities.iter().copied());
        Ok(())
    }

    /// Writes index records and tracks them. A record written twice keeps
    /// the later set.
    pub fn put_records(&mut self, records: &[(Vec<u8>, EntitySet)]) -> CoreResult<()> {
        seed_index(self.store, self.partition, self.component, self.index, records)?;
        for (value, set) in records {
            self.records.insert(value.clone(), set.clone());
        }
        Ok(())
    }

    /// Entities the component scan should return, in order.
    pub fn expected_entities(&self) -> Vec<Entity> {
        self.entities.iter().copied().collect()
    }

    /// Entities the index scan should return, in order: records by value,
    /// members of each record in ascending order.
    pub fn expected_index_order(&self) -> Vec<Entity> {
        self.records
            .values()
            .flat_map(|set| set.iter().copied())
            .collect()
    }

    /// Scans the component `n` at a time and checks the pages against the
    /// model.
    ///
    /// # Panics
    ///
    /// Panics if the pages are not the model split into runs of `n`.
    pub fn verify_component_scan(&self, n: usize) -> CoreResult<()> {
        let pages = collect_component_pages(self.store, self.partition, self.component, n)?;
        assert_pages(&pages, &self.expected_entities(), n);
        Ok(())
    }

    /// Scans the index `n` at a time and checks the pages against the model.
    ///
    /// # Panics
    ///
    /// Panics if the pages are not the model split into runs of `n`.
    pub fn verify_index_scan(&self, n: usize) -> CoreResult<()> {
        let pages =
            collect_index_pages(self.store, self.partition, self.component, self.index, n)?;
        assert_pages(&pages, &self.expected_index_order(), n);
        Ok(())
    }
}

/// Asserts that `pages` concatenate to `expected` and that every page but
/// the last holds exactly `n` entities.
///
/// # Panics
///
/// Panics on any mismatch.
pub fn assert_pages(pages: &[Vec<Entity>], expected: &[Entity], n: usize) {
    let flat: Vec<Entity> = pages.iter().flatten().copied().collect();
    assert_eq!(flat, expected, "pages do not cover the scan exactly once");
    if n == 0 {
        assert!(pages.len() <= 1, "unbounded scan returned {} pages", pages.len());
        return;
    }
    if let Some((_, full)) = pages.split_last() {
        for (i, page) in full.iter().enumerate() {
            assert_eq!(page.len(), n, "page {i} is short");
        }
    }
}
