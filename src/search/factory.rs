//! Factory function for creating search index instances

use super::{Fts5LevenshteinSearchIndex, NoOpSearchIndex, SearchIndex};
use crate::config::{SearchEngine, SearchSettings};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Create the search index selected by `settings.engine`.
///
/// The FTS5 index keeps its documents in `search_db_path`. Builds with the
/// `no_search` feature always get the no-op index.
pub fn create_search_index(
    settings: &SearchSettings,
    search_db_path: &Path,
) -> Result<Arc<dyn SearchIndex>> {
    if cfg!(feature = "no_search") {
        info!("Search disabled at build time, using NoOp search index");
        return Ok(Arc::new(NoOpSearchIndex));
    }

    match settings.engine {
        SearchEngine::Fts5 => {
            info!(
                "Creating FTS5+Levenshtein search index at {:?} (typo-tolerant)",
                search_db_path
            );
            Ok(Arc::new(Fts5LevenshteinSearchIndex::new(
                search_db_path,
                settings.tuning(),
            )?))
        }
        SearchEngine::Noop => {
            info!("Creating NoOp search index (search disabled)");
            Ok(Arc::new(NoOpSearchIndex))
        }
    }
}
