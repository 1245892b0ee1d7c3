//! Keeps the search index in step with catalog mutations.
//!
//! The catalog database is the source of truth. Once a catalog write has
//! committed, a failure to update the index is logged and swallowed: the
//! index is repaired later by `reindex_all`. Explicit index operations still
//! surface `ExternalService` errors to their caller.

use super::models::ReindexReport;
use crate::catalog_store::{Artist, Song};
use crate::error::CatalogResult;
use crate::search::{EntityType, SearchFields, SearchHit, SearchIndex, SearchIndexStats};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

pub struct SearchIndexSynchronizer {
    index: Arc<dyn SearchIndex>,
}

impl SearchIndexSynchronizer {
    pub fn new(index: Arc<dyn SearchIndex>) -> Self {
        SearchIndexSynchronizer { index }
    }

    /// Upserts a document, reporting failures.
    pub fn index_entity(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        fields: &SearchFields,
    ) -> CatalogResult<()> {
        self.index.upsert(entity_type, entity_id, fields)
    }

    pub fn sync_song(&self, song: &Song) {
        if let Err(e) = self.index_entity(EntityType::Song, song.id, &SearchFields::from(song)) {
            warn!("Failed to index song {}: {}", song.id, e);
        }
    }

    pub fn sync_artist(&self, artist: &Artist) {
        if let Err(e) = self.index_entity(EntityType::Artist, artist.id, &SearchFields::from(artist))
        {
            warn!("Failed to index artist {}: {}", artist.id, e);
        }
    }

    pub fn unindex(&self, entity_type: EntityType, entity_id: i64) {
        if let Err(e) = self.index.remove(entity_type, entity_id) {
            warn!(
                "Failed to remove {} {} from search index: {}",
                entity_type, entity_id, e
            );
        }
    }

    pub fn search(&self, query: &str, max_results: usize) -> CatalogResult<Vec<SearchHit>> {
        self.index.query(query, max_results)
    }

    pub fn stats(&self) -> CatalogResult<SearchIndexStats> {
        self.index.stats()
    }

    /// Rewrites a document for every given entity and drops documents of
    /// entities that are not in the lists. Stops at the first index failure.
    pub fn reindex_all(&self, songs: &[Song], artists: &[Artist]) -> CatalogResult<ReindexReport> {
        let mut live = HashSet::with_capacity(songs.len() + artists.len());

        for song in songs {
            self.index_entity(EntityType::Song, song.id, &SearchFields::from(song))?;
            live.insert((EntityType::Song, song.id));
        }
        for artist in artists {
            self.index_entity(EntityType::Artist, artist.id, &SearchFields::from(artist))?;
            live.insert((EntityType::Artist, artist.id));
        }

        let mut removed = 0;
        for key in self.index.document_keys()? {
            if !live.contains(&key) {
                self.index.remove(key.0, key.1)?;
                removed += 1;
            }
        }

        let report = ReindexReport {
            songs: songs.len(),
            artists: artists.len(),
            removed,
        };
        info!(
            "Reindexed {} songs and {} artists, removed {} stale documents",
            report.songs, report.artists, report.removed
        );
        Ok(report)
    }
}
