//! Request and read models of the catalog service.
//!
//! Read models flatten the underlying entity so a serialized `PopularSong`
//! looks like a song with two extra fields.

use crate::catalog_store::{Artist, ArtistId, SongId, Song, StoreStats};
pub use crate::catalog_store::{CreditedArtist, SongWithArtists};
use crate::search::SearchIndexStats;
use serde::Serialize;

#[derive(Debug, Clone, Default)]
pub struct SongDraft {
    pub title: String,
    pub description: String,
    pub content: String,
    /// Credited artists, in display order.
    pub artist_ids: Vec<ArtistId>,
}

#[derive(Debug, Clone, Default)]
pub struct ArtistDraft {
    pub name: String,
    pub description: String,
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtistRef {
    pub id: ArtistId,
    pub name: String,
}

impl From<&Artist> for ArtistRef {
    fn from(artist: &Artist) -> Self {
        ArtistRef {
            id: artist.id,
            name: artist.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopularSong {
    #[serde(flatten)]
    pub song: Song,
    pub artists: Vec<ArtistRef>,
    pub views: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongSummary {
    pub id: SongId,
    pub title: String,
    pub artists: Vec<ArtistRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtistInfo {
    #[serde(flatten)]
    pub artist: Artist,
    pub songs: Vec<SongSummary>,
}

/// A search hit joined with the current catalog entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResolvedSearchHit {
    Song { score: f64, song: Song },
    Artist { score: f64, artist: Artist },
}

impl ResolvedSearchHit {
    pub fn score(&self) -> f64 {
        match self {
            ResolvedSearchHit::Song { score, .. } | ResolvedSearchHit::Artist { score, .. } => {
                *score
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReindexReport {
    pub songs: usize,
    pub artists: usize,
    /// Stale documents whose entity no longer exists.
    pub removed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub catalog: StoreStats,
    pub search: SearchIndexStats,
}
