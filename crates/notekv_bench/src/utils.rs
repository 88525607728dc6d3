//! Benchmark utilities.

use notekv_core::{Commit, Component, CoreResult, Entity, EntitySet, Prefix, Store, Txn};
use rand::seq::SliceRandom;
use rand::Rng;

/// Partition used by the benchmarks.
pub const PARTITION: Entity = Entity::new(1);
/// Component used by the benchmarks.
pub const COMPONENT: Component = Component::new(1);
/// Index used by the benchmarks.
pub const INDEX: Component = Component::new(1);

/// Generate random value bytes of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate entities `1..=count` in random order.
pub fn shuffled_entities(count: u64) -> Vec<Entity> {
    let mut es: Vec<Entity> = (1..=count).map(Entity::new).collect();
    es.shuffle(&mut rand::thread_rng());
    es
}

/// Build a sorted entity set of `1..=count`.
pub fn sequential_set(count: u64) -> EntitySet {
    (1..=count).map(Entity::new).collect()
}

/// Stores `count` entities under [`COMPONENT`].
pub fn seed_component<S: Store>(store: &S, count: u64) -> CoreResult<()> {
    let mut txn = store.new_txn(true)?;
    for e in 1..=count {
        txn.set(&Prefix::value(PARTITION, COMPONENT, Entity::new(e)), &[])?;
    }
    txn.commit()
}

/// Writes `records` index records of `per_record` entities each under
/// [`INDEX`].
pub fn seed_index<S: Store>(store: &S, records: u64, per_record: u64) -> CoreResult<()> {
    let mut txn = store.new_txn(true)?;
    for r in 0..records {
        let set: EntitySet = (r * per_record + 1..=(r + 1) * per_record)
            .map(Entity::new)
            .collect();
        let key = Prefix::index_record(PARTITION, COMPONENT, INDEX, &r.to_be_bytes());
        txn.set_value(&key, &set)?;
    }
    txn.commit()
}
