//! Storage traits for the catalog.
//!
//! `CatalogStore` owns songs, artists and view events. `AssociationManager`
//! owns the ordered credits between them. Both are implemented by
//! `SqliteCatalogStore`, but callers only see the traits.

use super::models::*;
use crate::error::CatalogResult;
use std::collections::HashMap;

pub trait CatalogStore: Send + Sync {
    // =========================================================================
    // Songs
    // =========================================================================

    /// Persist a new song and credit `artist_ids` in the given order.
    ///
    /// Every artist must exist. Either the song and all of its links are
    /// written, or nothing is.
    fn create_song(&self, song: NewSong, artist_ids: &[ArtistId]) -> CatalogResult<SongWithLinks>;

    fn get_song(&self, id: SongId) -> CatalogResult<Song>;

    /// The song together with its links, ordered by position.
    fn get_song_with_associations(&self, id: SongId) -> CatalogResult<SongWithLinks>;

    /// The song with its credited artists joined in, ordered by position.
    fn get_song_with_artists(&self, id: SongId) -> CatalogResult<SongWithArtists>;

    /// Credited artists of each song, read from one snapshot. Songs that do
    /// not exist map to an empty list.
    fn get_credits(&self, song_ids: &[SongId]) -> CatalogResult<HashMap<SongId, Vec<CreditedArtist>>>;

    fn update_song(&self, id: SongId, update: SongUpdate) -> CatalogResult<Song>;

    /// Applies `update` and, when `artist_ids` is given, replaces the credits
    /// with them, all in one transaction. On error nothing is written.
    fn update_song_with_credits(
        &self,
        id: SongId,
        update: SongUpdate,
        artist_ids: Option<&[ArtistId]>,
    ) -> CatalogResult<SongWithLinks>;

    /// Removes the song and its links. View events are kept.
    fn delete_song(&self, id: SongId) -> CatalogResult<()>;

    fn list_songs(&self) -> CatalogResult<Vec<Song>>;

    // =========================================================================
    // Artists
    // =========================================================================

    fn create_artist(&self, artist: NewArtist) -> CatalogResult<Artist>;

    fn get_artist(&self, id: ArtistId) -> CatalogResult<Artist>;

    /// All artists ordered by id.
    fn get_artists(&self) -> CatalogResult<Vec<Artist>>;

    /// Songs crediting the artist, ordered by song id, each with its full
    /// ordered link list.
    fn get_artist_songs(&self, artist_id: ArtistId) -> CatalogResult<Vec<SongWithLinks>>;

    fn update_artist(&self, id: ArtistId, update: ArtistUpdate) -> CatalogResult<Artist>;

    /// Removes the artist and every link to it. Positions of the remaining
    /// links on affected songs are compacted.
    fn delete_artist(&self, id: ArtistId) -> CatalogResult<()>;

    // =========================================================================
    // Views
    // =========================================================================

    /// Appends a view event stamped with the current time.
    fn record_view(&self, song_id: SongId) -> CatalogResult<ViewEvent>;

    /// Appends a view event with an explicit unix timestamp (seconds).
    fn record_view_at(&self, song_id: SongId, occurred_at: i64) -> CatalogResult<ViewEvent>;

    // =========================================================================
    // Counts
    // =========================================================================

    fn get_stats(&self) -> CatalogResult<StoreStats>;
}

/// Maintains the ordered artist credits of songs.
///
/// Every operation returns the song's full link list after the change,
/// ordered by position.
pub trait AssociationManager: Send + Sync {
    /// Credits `artist_id` at `order_index`, shifting later links back by one.
    ///
    /// `order_index` must be within `0..=current_len`.
    fn attach(
        &self,
        song_id: SongId,
        artist_id: ArtistId,
        order_index: u32,
    ) -> CatalogResult<Vec<AssociationLink>>;

    /// Removes the credit and closes the gap it leaves.
    fn detach(&self, song_id: SongId, artist_id: ArtistId) -> CatalogResult<Vec<AssociationLink>>;

    /// Atomically replaces the song's credits with `artist_ids`, positioned
    /// by their index in the slice.
    fn replace_all(
        &self,
        song_id: SongId,
        artist_ids: &[ArtistId],
    ) -> CatalogResult<Vec<AssociationLink>>;

    fn get_links(&self, song_id: SongId) -> CatalogResult<Vec<AssociationLink>>;
}
