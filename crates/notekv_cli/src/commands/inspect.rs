//! Inspect command implementation.

use super::{is_json, open_store};
use serde::Serialize;
use std::path::Path;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store path.
    pub path: String,
    /// Number of committed keys, the allocator's own key included.
    pub key_count: usize,
    /// Commit log size in bytes.
    pub log_size: u64,
    /// Allocator key, in hex.
    pub allocator_key: String,
    /// Allocator high-water mark after open.
    pub allocator_last: u64,
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path)?;
    let allocator = store.allocator()?;

    let result = InspectResult {
        path: path.display().to_string(),
        key_count: store.len(),
        log_size: store.log_size(),
        allocator_key: super::to_hex(allocator.key()),
        allocator_last: allocator.last().as_u64(),
    };
    store.close()?;

    if is_json(format) {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_text_output(&result);
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("notekv Store Inspection");
    println!("=======================");
    println!();
    println!("Path: {}", result.path);
    println!();
    println!("Storage:");
    println!("  Log size:  {} bytes", format_size(result.log_size));
    println!("  Keys:      {}", result.key_count);
    println!();
    println!("Allocator:");
    println!("  Key:       {}", result.allocator_key);
    println!("  Last:      {}", result.allocator_last);
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{}", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
