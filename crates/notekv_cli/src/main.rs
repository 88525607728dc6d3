//! notekv CLI
//!
//! Command-line tools for inspecting a notekv file store.
//!
//! # Commands
//!
//! - `inspect` - Display store statistics
//! - `dump` - Print every key/value pair in hex
//! - `alloc` - Allocate entities
//! - `scan` - Page through the entities holding a component
//! - `index` - Page through an index

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// notekv command-line store tools.
#[derive(Parser)]
#[command(name = "notekv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display store statistics
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print every key/value pair in hex
    Dump,

    /// Allocate entities and persist the allocator
    Alloc {
        /// Number of entities to allocate
        #[arg(short, long, default_value = "1")]
        count: usize,
    },

    /// Page through the entities holding a component
    Scan {
        /// Partition entity
        #[arg(long)]
        partition: u64,

        /// Component tag
        #[arg(short, long)]
        component: u16,

        /// First entity to return (0 starts at the beginning)
        #[arg(short, long, default_value = "0")]
        start: u64,

        /// Page size (0 for unbounded)
        #[arg(short, long, default_value = "100")]
        limit: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Page through the records of an index
    Index {
        /// Partition entity
        #[arg(long)]
        partition: u64,

        /// Component tag
        #[arg(short, long)]
        component: u16,

        /// Index tag
        #[arg(short, long)]
        index: u16,

        /// Cursor key from a previous page, in hex
        #[arg(long, default_value = "")]
        cursor_key: String,

        /// Cursor offset from a previous page
        #[arg(long, default_value = "0")]
        cursor_offset: usize,

        /// Page size (0 for unbounded)
        #[arg(short, long, default_value = "100")]
        limit: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Store path required for inspect")?;
            commands::inspect::run(&path, &format)?;
        }
        Commands::Dump => {
            let path = cli.path.ok_or("Store path required for dump")?;
            commands::dump::run(&path)?;
        }
        Commands::Alloc { count } => {
            let path = cli.path.ok_or("Store path required for alloc")?;
            commands::alloc::run(&path, count)?;
        }
        Commands::Scan {
            partition,
            component,
            start,
            limit,
            format,
        } => {
            let path = cli.path.ok_or("Store path required for scan")?;
            commands::scan::run(&path, partition, component, start, limit, &format)?;
        }
        Commands::Index {
            partition,
            component,
            index,
            cursor_key,
            cursor_offset,
            limit,
            format,
        } => {
            let path = cli.path.ok_or("Store path required for index")?;
            let cursor = commands::index::CursorArgs {
                key_hex: cursor_key,
                offset: cursor_offset,
            };
            commands::index::run(&path, partition, component, index, &cursor, limit, &format)?;
        }
        Commands::Version => {
            println!("notekv CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("notekv core v{}", notekv_core::VERSION);
        }
    }

    Ok(())
}
