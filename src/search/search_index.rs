//! Search index trait and document types.

use crate::catalog_store::{Artist, Song};
use crate::error::{CatalogError, CatalogResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Song,
    Artist,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Song => "song",
            EntityType::Artist => "artist",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "song" => Ok(EntityType::Song),
            "artist" => Ok(EntityType::Artist),
            other => Err(CatalogError::validation(format!(
                "Unknown entity type '{}'",
                other
            ))),
        }
    }
}

/// Stable key of the document for one entity, e.g. `song_42`.
///
/// Re-indexing an entity replaces the document under the same key.
pub fn document_key(entity_type: EntityType, entity_id: i64) -> String {
    format!("{}_{}", entity_type.as_str(), entity_id)
}

/// Inverse of [`document_key`].
pub fn parse_document_key(key: &str) -> Option<(EntityType, i64)> {
    let (entity_type, entity_id) = key.split_once('_')?;
    Some((entity_type.parse().ok()?, entity_id.parse().ok()?))
}

/// Searchable text of a document.
///
/// Songs fill `title`, `description` and `content`; artists fill `name` and
/// `description`. `title` and `name` are weighted higher than the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFields {
    pub title: String,
    pub name: String,
    pub description: String,
    pub content: String,
}

impl From<&Song> for SearchFields {
    fn from(song: &Song) -> Self {
        SearchFields {
            title: song.title.clone(),
            name: String::new(),
            description: song.description.clone(),
            content: song.content.clone(),
        }
    }
}

impl From<&Artist> for SearchFields {
    fn from(artist: &Artist) -> Self {
        SearchFields {
            title: String::new(),
            name: artist.name.clone(),
            description: artist.description.clone(),
            content: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    /// Higher is more relevant.
    pub score: f64,
    pub entity_type: EntityType,
    pub entity_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchIndexStats {
    pub documents: usize,
    pub vocabulary_words: usize,
    /// Human readable name of the index implementation.
    pub engine: String,
}

/// A text index kept in sync with the catalog.
///
/// Implementations live outside the catalog's transactional boundary, so
/// every failure is reported as `CatalogError::ExternalService`. A successful
/// `upsert` or `remove` is visible to the next `query`.
pub trait SearchIndex: Send + Sync {
    /// Creates or fully replaces the document of the entity.
    fn upsert(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        fields: &SearchFields,
    ) -> CatalogResult<()>;

    /// Removes the entity's document. Removing a missing document is not an
    /// error.
    fn remove(&self, entity_type: EntityType, entity_id: i64) -> CatalogResult<()>;

    /// Typo-tolerant relevance search, best hits first.
    ///
    /// A query with no searchable terms yields no hits.
    fn query(&self, text: &str, max_results: usize) -> CatalogResult<Vec<SearchHit>>;

    /// Every entity that currently has a document.
    fn document_keys(&self) -> CatalogResult<Vec<(EntityType, i64)>>;

    fn stats(&self) -> CatalogResult<SearchIndexStats>;
}

/// An index that stores nothing and finds nothing.
pub struct NoOpSearchIndex;

impl SearchIndex for NoOpSearchIndex {
    fn upsert(&self, _: EntityType, _: i64, _: &SearchFields) -> CatalogResult<()> {
        Ok(())
    }

    fn remove(&self, _: EntityType, _: i64) -> CatalogResult<()> {
        Ok(())
    }

    fn query(&self, _text: &str, _max_results: usize) -> CatalogResult<Vec<SearchHit>> {
        Ok(Vec::new())
    }

    fn document_keys(&self) -> CatalogResult<Vec<(EntityType, i64)>> {
        Ok(Vec::new())
    }

    fn stats(&self) -> CatalogResult<SearchIndexStats> {
        Ok(SearchIndexStats {
            documents: 0,
            vocabulary_words: 0,
            engine: "NoOp (disabled)".to_string(),
        })
    }
}

impl<T: SearchIndex + ?Sized> SearchIndex for std::sync::Arc<T> {
    fn upsert(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        fields: &SearchFields,
    ) -> CatalogResult<()> {
        (**self).upsert(entity_type, entity_id, fields)
    }

    fn remove(&self, entity_type: EntityType, entity_id: i64) -> CatalogResult<()> {
        (**self).remove(entity_type, entity_id)
    }

    fn query(&self, text: &str, max_results: usize) -> CatalogResult<Vec<SearchHit>> {
        (**self).query(text, max_results)
    }

    fn document_keys(&self) -> CatalogResult<Vec<(EntityType, i64)>> {
        (**self).document_keys()
    }

    fn stats(&self) -> CatalogResult<SearchIndexStats> {
        (**self).stats()
    }
}
