//! Index command implementation.

use super::{from_hex, is_json, open_store, to_hex};
use notekv_core::{Component, CoreResult, Entity, IndexCursor, Partitioned, Store};
use serde::Serialize;
use std::path::Path;

/// Cursor arguments as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CursorArgs {
    /// Cursor key, in hex.
    pub key_hex: String,
    /// Cursor offset.
    pub offset: usize,
}

/// One page of an index scan.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct IndexPage {
    /// Entities on this page, in index order.
    pub entities: Vec<u64>,
    /// Cursor key for the next page, in hex.
    pub cursor_key: String,
    /// Cursor offset for the next page.
    pub cursor_offset: usize,
}

/// Runs the index command.
pub fn run(
    path: &Path,
    partition: u64,
    component: u16,
    index: u16,
    cursor: &CursorArgs,
    limit: usize,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut cursor = IndexCursor {
        key: from_hex(&cursor.key_hex)?,
        offset: cursor.offset,
    };
    let store = open_store(path)?;
    let page = index_page(
        &store,
        Entity::new(partition),
        Component::new(component),
        Component::new(index),
        &mut cursor,
        limit,
    )?;
    store.close()?;

    if is_json(format) {
        println!("{}", serde_json::to_string_pretty(&page)?);
    } else {
        for e in &page.entities {
            println!("{e}");
        }
        println!(
            "next cursor: --cursor-key {} --cursor-offset {}",
            page.cursor_key, page.cursor_offset
        );
    }
    Ok(())
}

/// Reads one page of `index` on `component`, advancing `cursor`.
pub fn index_page<S: Store>(
    store: &S,
    partition: Entity,
    component: Component,
    index: Component,
    cursor: &mut IndexCursor,
    limit: usize,
) -> CoreResult<IndexPage> {
    let mut txn = store.new_txn(false)?;
    let entities = Partitioned::new(&mut txn, partition).entities_by_component_index(
        component, index, cursor, limit,
    )?;
    Ok(IndexPage {
        entities: entities.into_iter().map(Entity::as_u64).collect(),
        cursor_key: to_hex(&cursor.key),
        cursor_offset: cursor.offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use notekv_core::{Commit, EntitySet, Prefix, Txn};
    use notekv_storage::MemoryStore;

    #[test]
    fn cursor_round_trips_through_hex() {
        let store = MemoryStore::new().unwrap();
        let (p, c, ix) = (Entity::new(1), Component::new(2), Component::new(1));
        let mut txn = store.new_txn(true).unwrap();
        let a: EntitySet = vec![Entity::new(1), Entity::new(2)].into();
        let b: EntitySet = vec![Entity::new(3)].into();
        txn.set_value(&Prefix::index_record(p, c, ix, b"A"), &a).unwrap();
        txn.set_value(&Prefix::index_record(p, c, ix, b"B"), &b).unwrap();
        txn.commit().unwrap();

        let mut cursor = IndexCursor::new();
        let first = index_page(&store, p, c, ix, &mut cursor, 2).unwrap();
        assert_eq!(first.entities, vec![1, 2]);
        assert_eq!(first.cursor_key, "41");
        assert_eq!(first.cursor_offset, 2);

        let mut resumed = IndexCursor {
            key: from_hex(&first.cursor_key).unwrap(),
            offset: first.cursor_offset,
        };
        let second = index_page(&store, p, c, ix, &mut resumed, 2).unwrap();
        assert_eq!(second.entities, vec![3]);
        assert_eq!(second.cursor_key, "42");
        assert_eq!(second.cursor_offset, 1);
    }
}
