//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::TestCatalog;
//!
//! #[test]
//! fn test_create_artist() {
//!     let catalog = TestCatalog::new();
//!     let artist = catalog.artist("The Beatles");
//!     assert_eq!(artist.name, "The Beatles");
//! }
//! ```

mod constants;
mod fixtures;

pub use constants::*;
pub use fixtures::{FailingSearchIndex, TestCatalog};
