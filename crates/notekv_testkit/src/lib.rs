//! # notekv Testkit
//!
//! Test utilities for notekv.
//!
//! This crate provides:
//! - Temporary stores and seeding helpers
//! - Property-based test generators using proptest
//! - A scan harness that checks paginated scans against a model, on any
//!   backend
//!
//! ## Usage
//!
//! ```rust
//! use notekv_testkit::prelude::*;
//!
//! let pages = with_memory_store(|store| {
//!     seed_component(store, scenarios::PARTITION, scenarios::COMPONENT, &[
//!         notekv_core::Entity::new(1),
//!         notekv_core::Entity::new(2),
//!     ])
//!     .unwrap();
//!     collect_component_pages(store, scenarios::PARTITION, scenarios::COMPONENT, 1).unwrap()
//! });
//! assert_eq!(pages.len(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
