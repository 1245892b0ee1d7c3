//! Chords Catalog Library
//!
//! Songs, artists and their ordered credits, view-based popularity ranking
//! and a full-text search index kept in step with the catalog.

pub mod catalog_store;
pub mod config;
pub mod error;
pub mod popularity;
pub mod search;
pub mod service;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use catalog_store::{AssociationManager, CatalogStore, SqliteCatalogStore};
pub use error::{CatalogError, CatalogResult};
pub use popularity::{PopularityPeriod, PopularityRanker};
pub use search::{Fts5LevenshteinSearchIndex, NoOpSearchIndex, SearchIndex};
pub use service::{Caller, CatalogService, UserRole};
