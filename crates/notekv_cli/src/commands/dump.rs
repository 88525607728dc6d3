//! Dump command implementation.

use super::open_store;
use std::io::{self, Write};
use std::path::Path;

/// Runs the dump command, writing every pair to stdout.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    store.dump(&mut out)?;
    out.flush()?;
    store.close()?;
    Ok(())
}
