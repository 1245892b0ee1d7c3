//! Test fixtures: a catalog service backed by throw-away databases.
//!
//! Not every test binary uses every helper.
#![allow(dead_code)]

use super::constants::*;
use chords_catalog::catalog_store::{Artist, ArtistId, SongId, SongWithLinks, SqliteCatalogStore};
use chords_catalog::error::{CatalogError, CatalogResult};
use chords_catalog::search::{
    EntityType, Fts5LevenshteinSearchIndex, SearchFields, SearchHit, SearchIndex,
    SearchIndexStats, SearchTuning,
};
use chords_catalog::service::{ArtistDraft, Caller, CatalogService, SongDraft};
use chords_catalog::CatalogStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

pub struct TestCatalog {
    pub service: CatalogService,
    pub store: Arc<SqliteCatalogStore>,
    pub index: Arc<dyn SearchIndex>,
    // Dropped last, removes both database files.
    _dir: TempDir,
}

impl TestCatalog {
    /// A catalog with the FTS5 search index.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let index = Fts5LevenshteinSearchIndex::new(
            &dir.path().join("search.db"),
            SearchTuning::default(),
        )
        .expect("Failed to open search index");
        Self::build(dir, Arc::new(index))
    }

    /// A catalog wired to the given search index.
    pub fn with_search_index(index: Arc<dyn SearchIndex>) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        Self::build(dir, index)
    }

    fn build(dir: TempDir, index: Arc<dyn SearchIndex>) -> Self {
        let store = Arc::new(
            SqliteCatalogStore::new(dir.path().join("catalog.db"), 2)
                .expect("Failed to open catalog store"),
        );
        let service = CatalogService::with_sqlite(store.clone(), index.clone());
        TestCatalog {
            service,
            store,
            index,
            _dir: dir,
        }
    }

    pub fn admin(&self) -> Caller {
        Caller::admin(ADMIN_ID)
    }

    pub fn uploader(&self) -> Caller {
        Caller::regular(UPLOADER_ID)
    }

    pub fn artist(&self, name: &str) -> Artist {
        self.service
            .create_artist(
                &self.admin(),
                ArtistDraft {
                    name: name.to_string(),
                    description: format!("{} biography", name),
                    image_url: String::new(),
                },
            )
            .expect("Failed to create artist")
    }

    pub fn song(&self, title: &str, artist_ids: &[ArtistId]) -> SongWithLinks {
        self.song_with_content(title, "[C] [G] [Am] [F]", artist_ids)
    }

    pub fn song_with_content(
        &self,
        title: &str,
        content: &str,
        artist_ids: &[ArtistId],
    ) -> SongWithLinks {
        self.service
            .create_song(
                &self.uploader(),
                SongDraft {
                    title: title.to_string(),
                    description: String::new(),
                    content: content.to_string(),
                    artist_ids: artist_ids.to_vec(),
                },
            )
            .expect("Failed to create song")
    }

    /// Records `count` views of the song at `occurred_at`.
    pub fn views_at(&self, song_id: SongId, occurred_at: i64, count: usize) {
        for _ in 0..count {
            self.store
                .record_view_at(song_id, occurred_at)
                .expect("Failed to record view");
        }
    }

    /// Makes every later UPDATE of a song row fail inside its transaction.
    pub fn fail_song_updates(&self) {
        rusqlite::Connection::open(self._dir.path().join("catalog.db"))
            .expect("Failed to open catalog db")
            .execute_batch(
                "CREATE TRIGGER fail_song_update BEFORE UPDATE ON songs \
                 BEGIN SELECT RAISE(ABORT, 'disk I/O error'); END;",
            )
            .expect("Failed to install trigger");
    }

    pub fn hits_for(&self, query: &str) -> Vec<(EntityType, i64)> {
        self.service
            .search(query)
            .expect("Search failed")
            .into_iter()
            .map(|hit| (hit.entity_type, hit.entity_id))
            .collect()
    }
}

/// A search index whose every operation fails, as if the index were down.
#[derive(Default)]
pub struct FailingSearchIndex {
    pub attempts: AtomicUsize,
}

impl FailingSearchIndex {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> CatalogResult<T> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(CatalogError::ExternalService(
            "search index unreachable".to_string(),
        ))
    }
}

impl SearchIndex for FailingSearchIndex {
    fn upsert(&self, _: EntityType, _: i64, _: &SearchFields) -> CatalogResult<()> {
        self.fail()
    }

    fn remove(&self, _: EntityType, _: i64) -> CatalogResult<()> {
        self.fail()
    }

    fn query(&self, _: &str, _: usize) -> CatalogResult<Vec<SearchHit>> {
        self.fail()
    }

    fn document_keys(&self) -> CatalogResult<Vec<(EntityType, i64)>> {
        self.fail()
    }

    fn stats(&self) -> CatalogResult<SearchIndexStats> {
        self.fail()
    }
}
