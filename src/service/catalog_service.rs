//! The catalog's public operations.
//!
//! Every mutation commits to the catalog database first and only then updates
//! the search index, so a search miss is the worst a failing index can cause.

use super::caller::Caller;
use super::models::*;
use super::search_sync::SearchIndexSynchronizer;
use crate::catalog_store::validation::validate_song_credits;
use crate::catalog_store::{
    Artist, ArtistId, ArtistUpdate, AssociationLink, AssociationManager, CatalogStore, NewArtist,
    NewSong, Song, SongId, SongUpdate, SongWithLinks, SqliteCatalogStore,
};
use crate::config::{AppConfig, PopularitySettings, SearchSettings};
use crate::error::CatalogResult;
use crate::popularity::{PopularityPeriod, PopularityQuery, PopularityRanker, RankedSong};
use crate::search::{create_search_index, EntityType, SearchFields, SearchHit, SearchIndex};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    associations: Arc<dyn AssociationManager>,
    ranker: Arc<dyn PopularityRanker>,
    search_sync: SearchIndexSynchronizer,
    max_search_results: usize,
    popularity: PopularitySettings,
}

impl CatalogService {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        associations: Arc<dyn AssociationManager>,
        ranker: Arc<dyn PopularityRanker>,
        search_index: Arc<dyn SearchIndex>,
    ) -> Self {
        CatalogService {
            store,
            associations,
            ranker,
            search_sync: SearchIndexSynchronizer::new(search_index),
            max_search_results: SearchSettings::default().max_results,
            popularity: PopularitySettings::default(),
        }
    }

    /// Wires one SQLite store into all three storage roles.
    pub fn with_sqlite(store: Arc<SqliteCatalogStore>, search_index: Arc<dyn SearchIndex>) -> Self {
        Self::new(store.clone(), store.clone(), store, search_index)
    }

    pub fn with_limits(mut self, max_search_results: usize, popularity: PopularitySettings) -> Self {
        self.max_search_results = max_search_results;
        self.popularity = popularity;
        self
    }

    /// Opens the catalog and search databases described by `config`.
    pub fn open(config: &AppConfig) -> Result<Self> {
        let store = Arc::new(SqliteCatalogStore::new(
            config.catalog_db_path(),
            config.read_pool_size,
        )?);
        let search_index = create_search_index(&config.search, &config.search_db_path())?;
        Ok(Self::with_sqlite(store, search_index)
            .with_limits(config.search.max_results, config.popularity.clone()))
    }

    // =========================================================================
    // Songs
    // =========================================================================

    /// Creates a song uploaded by `caller` and credits `draft.artist_ids` in
    /// order. At least one artist is required.
    pub fn create_song(&self, caller: &Caller, draft: SongDraft) -> CatalogResult<SongWithLinks> {
        validate_song_credits(&draft.artist_ids)?;

        let created = self.store.create_song(
            NewSong {
                title: draft.title,
                description: draft.description,
                content: draft.content,
                uploaded_by: caller.user_id,
            },
            &draft.artist_ids,
        )?;
        info!(
            "User {} created song {} '{}'",
            caller.user_id, created.song.id, created.song.title
        );

        self.search_sync.sync_song(&created.song);
        Ok(created)
    }

    /// Applies a partial update. When `artist_ids` is given the credits are
    /// replaced in the same transaction; an empty list is rejected.
    pub fn update_song(
        &self,
        caller: &Caller,
        song_id: SongId,
        update: SongUpdate,
        artist_ids: Option<Vec<ArtistId>>,
    ) -> CatalogResult<SongWithLinks> {
        let current = self.store.get_song(song_id)?;
        caller.ensure_can_edit(&current)?;
        if let Some(ids) = &artist_ids {
            validate_song_credits(ids)?;
        }

        let updated = self
            .store
            .update_song_with_credits(song_id, update, artist_ids.as_deref())?;
        info!("User {} updated song {}", caller.user_id, song_id);

        self.search_sync.sync_song(&updated.song);
        Ok(updated)
    }

    pub fn delete_song(&self, caller: &Caller, song_id: SongId) -> CatalogResult<()> {
        let current = self.store.get_song(song_id)?;
        caller.ensure_can_edit(&current)?;

        self.store.delete_song(song_id)?;
        info!("User {} deleted song {}", caller.user_id, song_id);

        self.search_sync.unindex(EntityType::Song, song_id);
        Ok(())
    }

    /// Returns the song and records one view of it.
    pub fn get_song(&self, song_id: SongId) -> CatalogResult<Song> {
        let song = self.store.get_song(song_id)?;
        self.store.record_view(song_id)?;
        Ok(song)
    }

    /// The song with its credited artists in display order. Does not count
    /// as a view.
    pub fn get_song_with_artists(&self, song_id: SongId) -> CatalogResult<SongWithArtists> {
        self.store.get_song_with_artists(song_id)
    }

    // =========================================================================
    // Credits
    // =========================================================================

    pub fn attach_artist(
        &self,
        caller: &Caller,
        song_id: SongId,
        artist_id: ArtistId,
        order_index: u32,
    ) -> CatalogResult<Vec<AssociationLink>> {
        let song = self.store.get_song(song_id)?;
        caller.ensure_can_edit(&song)?;
        self.associations.attach(song_id, artist_id, order_index)
    }

    pub fn detach_artist(
        &self,
        caller: &Caller,
        song_id: SongId,
        artist_id: ArtistId,
    ) -> CatalogResult<Vec<AssociationLink>> {
        let song = self.store.get_song(song_id)?;
        caller.ensure_can_edit(&song)?;
        self.associations.detach(song_id, artist_id)
    }

    // =========================================================================
    // Popularity
    // =========================================================================

    /// Songs ranked by views in `period` ("day", "week", "month", "year" or
    /// "allTime"). `limit` defaults to the configured page size and is
    /// clamped to the configured maximum.
    pub fn get_popular_songs(
        &self,
        period: &str,
        limit: Option<usize>,
        offset: usize,
    ) -> CatalogResult<Vec<PopularSong>> {
        let period: PopularityPeriod = period.parse()?;
        let query = PopularityQuery {
            period,
            limit: limit
                .unwrap_or(self.popularity.default_limit)
                .min(self.popularity.max_limit),
            offset,
        };
        let ranked = self.ranker.rank(&query)?;
        debug!(
            "Ranked {} songs for {} (limit {}, offset {})",
            ranked.len(),
            period,
            query.limit,
            query.offset
        );
        self.hydrate_ranked(ranked)
    }

    /// Joins credits from a single snapshot. A song deleted after ranking
    /// keeps its entry with no artists.
    fn hydrate_ranked(&self, ranked: Vec<RankedSong>) -> CatalogResult<Vec<PopularSong>> {
        let song_ids: Vec<SongId> = ranked.iter().map(|r| r.song.id).collect();
        let mut credits = self.store.get_credits(&song_ids)?;

        Ok(ranked
            .into_iter()
            .map(|entry| PopularSong {
                artists: artist_refs(credits.remove(&entry.song.id).unwrap_or_default()),
                song: entry.song,
                views: entry.views,
            })
            .collect())
    }

    // =========================================================================
    // Artists
    // =========================================================================

    pub fn create_artist(&self, caller: &Caller, draft: ArtistDraft) -> CatalogResult<Artist> {
        caller.ensure_admin("create artists")?;

        let artist = self.store.create_artist(NewArtist {
            name: draft.name,
            description: draft.description,
            image_url: draft.image_url,
        })?;
        info!(
            "User {} created artist {} '{}'",
            caller.user_id, artist.id, artist.name
        );

        self.search_sync.sync_artist(&artist);
        Ok(artist)
    }

    pub fn update_artist(
        &self,
        caller: &Caller,
        artist_id: ArtistId,
        update: ArtistUpdate,
    ) -> CatalogResult<Artist> {
        caller.ensure_admin("update artists")?;

        let artist = self.store.update_artist(artist_id, update)?;
        info!("User {} updated artist {}", caller.user_id, artist_id);

        self.search_sync.sync_artist(&artist);
        Ok(artist)
    }

    /// Deletes the artist and drops it from every song it was credited on.
    pub fn delete_artist(&self, caller: &Caller, artist_id: ArtistId) -> CatalogResult<()> {
        caller.ensure_admin("delete artists")?;

        self.store.delete_artist(artist_id)?;
        info!("User {} deleted artist {}", caller.user_id, artist_id);

        self.search_sync.unindex(EntityType::Artist, artist_id);
        Ok(())
    }

    pub fn get_artists(&self) -> CatalogResult<Vec<Artist>> {
        self.store.get_artists()
    }

    /// The artist with every song crediting it, each song listing all of its
    /// artists.
    pub fn get_artist_info(&self, artist_id: ArtistId) -> CatalogResult<ArtistInfo> {
        let artist = self.store.get_artist(artist_id)?;
        let songs = self.store.get_artist_songs(artist_id)?;
        let song_ids: Vec<SongId> = songs.iter().map(|s| s.song.id).collect();
        let mut credits = self.store.get_credits(&song_ids)?;

        let songs = songs
            .into_iter()
            .map(|s| SongSummary {
                artists: artist_refs(credits.remove(&s.song.id).unwrap_or_default()),
                id: s.song.id,
                title: s.song.title,
            })
            .collect();
        Ok(ArtistInfo { artist, songs })
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Raw hits, best first. Index failures surface as `ExternalService`.
    pub fn search(&self, query: &str) -> CatalogResult<Vec<SearchHit>> {
        self.search_sync.search(query, self.max_search_results)
    }

    /// Hits joined with the current catalog entities. Hits whose entity no
    /// longer exists are skipped.
    pub fn search_resolved(&self, query: &str) -> CatalogResult<Vec<ResolvedSearchHit>> {
        let hits = self.search(query)?;
        let mut resolved = Vec::with_capacity(hits.len());
        for hit in hits {
            let entity = match hit.entity_type {
                EntityType::Song => self
                    .store
                    .get_song(hit.entity_id)
                    .map(|song| ResolvedSearchHit::Song {
                        score: hit.score,
                        song,
                    }),
                EntityType::Artist => {
                    self.store
                        .get_artist(hit.entity_id)
                        .map(|artist| ResolvedSearchHit::Artist {
                            score: hit.score,
                            artist,
                        })
                }
            };
            match entity {
                Ok(entity) => resolved.push(entity),
                Err(e) if e.is_not_found() => {
                    debug!(
                        "Skipping stale search hit {} {}",
                        hit.entity_type, hit.entity_id
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(resolved)
    }

    /// Writes the given fields as the entity's search document.
    pub fn index_entity(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        fields: &SearchFields,
    ) -> CatalogResult<()> {
        self.search_sync.index_entity(entity_type, entity_id, fields)
    }

    /// Re-indexes one entity from its current catalog row.
    pub fn reindex_entity(&self, entity_type: EntityType, entity_id: i64) -> CatalogResult<()> {
        let fields = match entity_type {
            EntityType::Song => SearchFields::from(&self.store.get_song(entity_id)?),
            EntityType::Artist => SearchFields::from(&self.store.get_artist(entity_id)?),
        };
        self.index_entity(entity_type, entity_id, &fields)
    }

    /// Rebuilds the search index from the catalog.
    pub fn reindex_all(&self) -> CatalogResult<ReindexReport> {
        let songs = self.store.list_songs()?;
        let artists = self.store.get_artists()?;
        self.search_sync.reindex_all(&songs, &artists)
    }

    pub fn stats(&self) -> CatalogResult<CatalogStats> {
        Ok(CatalogStats {
            catalog: self.store.get_stats()?,
            search: self.search_sync.stats()?,
        })
    }
}

fn artist_refs(credits: Vec<CreditedArtist>) -> Vec<ArtistRef> {
    credits.iter().map(|c| ArtistRef::from(&c.artist)).collect()
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService")
            .field("max_search_results", &self.max_search_results)
            .field("popularity", &self.popularity)
            .finish_non_exhaustive()
    }
}
