//! Validation for catalog entities.
//!
//! Checks run before anything is written, so a rejected request never leaves
//! partial state behind.

use super::models::{ArtistId, ArtistUpdate, FieldUpdate, NewArtist, NewSong, SongUpdate};
use crate::error::CatalogError;
use std::collections::HashSet;
use std::fmt;

pub const MIN_ARTIST_NAME_CHARS: usize = 2;

#[derive(Debug, PartialEq, Eq)]
pub enum ValidationError {
    EmptyField {
        field: &'static str,
    },
    TooShort {
        field: &'static str,
        min_chars: usize,
    },
    NoArtists,
    DuplicateArtist {
        artist_id: ArtistId,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField { field } => {
                write!(f, "Field '{}' is required but was empty", field)
            }
            ValidationError::TooShort { field, min_chars } => {
                write!(
                    f,
                    "Field '{}' must be at least {} characters long",
                    field, min_chars
                )
            }
            ValidationError::NoArtists => {
                write!(f, "A song must be credited to at least one artist")
            }
            ValidationError::DuplicateArtist { artist_id } => {
                write!(f, "Artist {} appears more than once", artist_id)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for CatalogError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::DuplicateArtist { .. } => CatalogError::Conflict(e.to_string()),
            other => CatalogError::Validation(other.to_string()),
        }
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;

fn require_non_empty(field: &'static str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    Ok(())
}

fn require_min_chars(field: &'static str, value: &str, min_chars: usize) -> ValidationResult<()> {
    require_non_empty(field, value)?;
    if value.trim().chars().count() < min_chars {
        return Err(ValidationError::TooShort { field, min_chars });
    }
    Ok(())
}

/// A required field may be kept or replaced, never cleared.
fn require_update_non_empty(
    field: &'static str,
    update: &FieldUpdate<String>,
) -> ValidationResult<()> {
    match update {
        FieldUpdate::Keep => Ok(()),
        FieldUpdate::Set(value) => require_non_empty(field, value),
        FieldUpdate::Clear => Err(ValidationError::EmptyField { field }),
    }
}

pub fn validate_new_song(song: &NewSong) -> ValidationResult<()> {
    require_non_empty("title", &song.title)?;
    require_non_empty("content", &song.content)?;
    Ok(())
}

pub fn validate_song_update(update: &SongUpdate) -> ValidationResult<()> {
    require_update_non_empty("title", &update.title)?;
    require_update_non_empty("content", &update.content)?;
    Ok(())
}

pub fn validate_new_artist(artist: &NewArtist) -> ValidationResult<()> {
    require_min_chars("name", &artist.name, MIN_ARTIST_NAME_CHARS)
}

pub fn validate_artist_update(update: &ArtistUpdate) -> ValidationResult<()> {
    match &update.name {
        FieldUpdate::Keep => Ok(()),
        FieldUpdate::Set(name) => require_min_chars("name", name, MIN_ARTIST_NAME_CHARS),
        FieldUpdate::Clear => Err(ValidationError::EmptyField { field: "name" }),
    }
}

/// Rejects an artist id list that credits the same artist twice.
pub fn validate_artist_ids(artist_ids: &[ArtistId]) -> ValidationResult<()> {
    let mut seen = HashSet::with_capacity(artist_ids.len());
    for artist_id in artist_ids {
        if !seen.insert(*artist_id) {
            return Err(ValidationError::DuplicateArtist {
                artist_id: *artist_id,
            });
        }
    }
    Ok(())
}

/// Songs created through the service must credit someone.
pub fn validate_song_credits(artist_ids: &[ArtistId]) -> ValidationResult<()> {
    if artist_ids.is_empty() {
        return Err(ValidationError::NoArtists);
    }
    validate_artist_ids(artist_ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn song_requires_title_and_content() {
        let song = NewSong {
            title: "  ".to_string(),
            content: "Am".to_string(),
            ..Default::default()
        };
        assert_eq!(
            validate_new_song(&song),
            Err(ValidationError::EmptyField { field: "title" })
        );

        let song = NewSong {
            title: "Yesterday".to_string(),
            ..Default::default()
        };
        assert_eq!(
            validate_new_song(&song),
            Err(ValidationError::EmptyField { field: "content" })
        );
    }

    #[test]
    fn clearing_required_song_field_is_rejected() {
        let update = SongUpdate {
            content: FieldUpdate::Clear,
            ..Default::default()
        };
        assert!(validate_song_update(&update).is_err());

        let update = SongUpdate {
            description: FieldUpdate::Clear,
            ..Default::default()
        };
        assert!(validate_song_update(&update).is_ok());
    }

    #[test]
    fn artist_name_needs_two_chars() {
        let artist = NewArtist {
            name: "X".to_string(),
            ..Default::default()
        };
        assert_eq!(
            validate_new_artist(&artist),
            Err(ValidationError::TooShort {
                field: "name",
                min_chars: 2
            })
        );

        let artist = NewArtist {
            name: "U2".to_string(),
            ..Default::default()
        };
        assert!(validate_new_artist(&artist).is_ok());
    }

    #[test]
    fn duplicate_artist_maps_to_conflict() {
        let err: CatalogError = validate_artist_ids(&[1, 2, 1]).unwrap_err().into();
        assert!(matches!(err, CatalogError::Conflict(_)));
    }

    #[test]
    fn song_credits_cannot_be_empty() {
        let err: CatalogError = validate_song_credits(&[]).unwrap_err().into();
        assert!(matches!(err, CatalogError::Validation(_)));
    }
}
