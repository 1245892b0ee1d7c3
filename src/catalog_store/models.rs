//! Catalog entities as persisted by the catalog store.

use serde::{Deserialize, Serialize};

pub type SongId = i64;
pub type ArtistId = i64;
pub type UserId = i64;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: SongId,
    pub title: String,
    pub description: String,
    pub content: String,
    pub uploaded_by: UserId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
    pub id: ArtistId,
    pub name: String,
    pub description: String,
    pub image_url: String,
}

/// Credits one artist on one song at a given position.
///
/// For a given song, `order_index` values always form the sequence
/// `0..n` with no gaps or duplicates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationLink {
    pub song_id: SongId,
    pub artist_id: ArtistId,
    pub order_index: u32,
}

/// One access to a song's full content. Append-only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewEvent {
    pub id: i64,
    pub song_id: SongId,
    /// Unix timestamp, seconds.
    pub occurred_at: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SongWithLinks {
    pub song: Song,
    /// Ordered by `order_index` ascending.
    pub links: Vec<AssociationLink>,
}

impl SongWithLinks {
    pub fn artist_ids(&self) -> Vec<ArtistId> {
        self.links.iter().map(|l| l.artist_id).collect()
    }
}

/// An artist as credited on one song.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditedArtist {
    pub order_index: u32,
    #[serde(flatten)]
    pub artist: Artist,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SongWithArtists {
    #[serde(flatten)]
    pub song: Song,
    /// Ordered by `order_index`.
    pub artists: Vec<CreditedArtist>,
}

#[derive(Clone, Debug, Default)]
pub struct NewSong {
    pub title: String,
    pub description: String,
    pub content: String,
    pub uploaded_by: UserId,
}

#[derive(Clone, Debug, Default)]
pub struct NewArtist {
    pub name: String,
    pub description: String,
    pub image_url: String,
}

/// A single field of a partial update.
///
/// `Keep` leaves the stored value alone, `Set` overwrites it and `Clear`
/// resets it to the empty value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    #[default]
    Keep,
    Set(T),
    Clear,
}

impl<T: Default> FieldUpdate<T> {
    pub fn apply(self, current: &mut T) {
        match self {
            FieldUpdate::Keep => {}
            FieldUpdate::Set(value) => *current = value,
            FieldUpdate::Clear => *current = T::default(),
        }
    }

    pub fn is_keep(&self) -> bool {
        matches!(self, FieldUpdate::Keep)
    }
}

impl<T> From<Option<T>> for FieldUpdate<T> {
    /// `None` maps to `Keep`; use `FieldUpdate::Clear` explicitly to erase.
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => FieldUpdate::Set(v),
            None => FieldUpdate::Keep,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SongUpdate {
    pub title: FieldUpdate<String>,
    pub description: FieldUpdate<String>,
    pub content: FieldUpdate<String>,
}

impl SongUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_keep() && self.description.is_keep() && self.content.is_keep()
    }

    pub fn apply_to(self, song: &mut Song) {
        self.title.apply(&mut song.title);
        self.description.apply(&mut song.description);
        self.content.apply(&mut song.content);
    }
}

#[derive(Clone, Debug, Default)]
pub struct ArtistUpdate {
    pub name: FieldUpdate<String>,
    pub description: FieldUpdate<String>,
    pub image_url: FieldUpdate<String>,
}

impl ArtistUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_keep() && self.description.is_keep() && self.image_url.is_keep()
    }

    pub fn apply_to(self, artist: &mut Artist) {
        self.name.apply(&mut artist.name);
        self.description.apply(&mut artist.description);
        self.image_url.apply(&mut artist.image_url);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub songs: usize,
    pub artists: usize,
    pub links: usize,
    pub view_events: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song() -> Song {
        Song {
            id: 1,
            title: "Yesterday".to_string(),
            description: "ballad".to_string(),
            content: "Am G F".to_string(),
            uploaded_by: 7,
        }
    }

    #[test]
    fn keep_leaves_fields_untouched() {
        let mut s = song();
        SongUpdate::default().apply_to(&mut s);
        assert_eq!(s, song());
    }

    #[test]
    fn set_and_clear_are_distinguishable() {
        let mut s = song();
        SongUpdate {
            title: FieldUpdate::Set("Let It Be".to_string()),
            description: FieldUpdate::Clear,
            content: FieldUpdate::Keep,
        }
        .apply_to(&mut s);

        assert_eq!(s.title, "Let It Be");
        assert_eq!(s.description, "");
        assert_eq!(s.content, "Am G F");
    }

    #[test]
    fn option_maps_to_keep_or_set() {
        assert_eq!(FieldUpdate::<String>::from(None), FieldUpdate::Keep);
        assert_eq!(
            FieldUpdate::from(Some("x".to_string())),
            FieldUpdate::Set("x".to_string())
        );
    }
}
