//! Scan command implementation.

use super::{is_json, open_store};
use notekv_core::{Component, CoreResult, Entity, Partitioned, Store};
use serde::Serialize;
use std::path::Path;

/// One page of a component scan.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ScanPage {
    /// Entities on this page, ascending.
    pub entities: Vec<u64>,
    /// Value to pass as `--start` for the next page.
    pub next_start: u64,
}

/// Runs the scan command.
pub fn run(
    path: &Path,
    partition: u64,
    component: u16,
    start: u64,
    limit: usize,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path)?;
    let page = scan_page(
        &store,
        Entity::new(partition),
        Component::new(component),
        Entity::new(start),
        limit,
    )?;
    store.close()?;

    if is_json(format) {
        println!("{}", serde_json::to_string_pretty(&page)?);
    } else {
        for e in &page.entities {
            println!("{e}");
        }
        println!("next start: {}", page.next_start);
    }
    Ok(())
}

/// Reads one page of entities holding `component`, starting at `start`.
pub fn scan_page<S: Store>(
    store: &S,
    partition: Entity,
    component: Component,
    start: Entity,
    limit: usize,
) -> CoreResult<ScanPage> {
    let mut txn = store.new_txn(false)?;
    let mut next = start;
    let entities = Partitioned::new(&mut txn, partition).all_component_entities(
        component,
        Some(&mut next),
        limit,
    )?;
    Ok(ScanPage {
        entities: entities.into_iter().map(Entity::as_u64).collect(),
        next_start: next.as_u64(),
    })
}
