//! Shared helpers for the notekv benchmarks.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod utils;
