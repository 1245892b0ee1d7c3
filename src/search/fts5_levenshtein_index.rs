//! FTS5 search with Levenshtein-based typo tolerance.
//!
//! Documents live in their own SQLite database, separate from the catalog.
//! Query terms are corrected against a vocabulary of every indexed word, then
//! OR-combined into an FTS5 `MATCH` expression ranked by column-weighted
//! `bm25`.

use super::levenshtein::{tokenize, Vocabulary};
use super::search_index::{
    document_key, parse_document_key, EntityType, SearchFields, SearchHit, SearchIndex,
    SearchIndexStats,
};
use crate::error::{CatalogError, CatalogResult};
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

const ENGINE_NAME: &str = "FTS5+Levenshtein";

/// Ranking and typo-correction knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchTuning {
    /// Upper bound on edits per query term; short terms get fewer.
    pub max_edit_distance: usize,
    /// bm25 weight of `title` and `name`.
    pub title_weight: f64,
    /// bm25 weight of `description` and `content`.
    pub body_weight: f64,
}

impl Default for SearchTuning {
    fn default() -> Self {
        SearchTuning {
            max_edit_distance: 2,
            title_weight: 3.0,
            body_weight: 1.0,
        }
    }
}

pub struct Fts5LevenshteinSearchIndex {
    conn: Mutex<Connection>,
    vocabulary: RwLock<Vocabulary>,
    tuning: SearchTuning,
}

fn external(e: anyhow::Error) -> CatalogError {
    CatalogError::ExternalService(format!("{:#}", e))
}

impl Fts5LevenshteinSearchIndex {
    /// Opens (or creates) the index database at `db_path` and loads the
    /// vocabulary of whatever is already indexed.
    pub fn new(db_path: &Path, tuning: SearchTuning) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open search database {:?}", db_path))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::create_tables(&conn)?;

        let vocabulary = Self::load_vocabulary_from_index(&conn)?;
        info!(
            "Opened search index {:?}: {} documents, {} vocabulary words",
            db_path,
            Self::document_count(&conn)?,
            vocabulary.len()
        );

        Ok(Self {
            conn: Mutex::new(conn),
            vocabulary: RwLock::new(vocabulary),
            tuning,
        })
    }

    fn create_tables(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE VIRTUAL TABLE IF NOT EXISTS search_documents USING fts5(
                doc_key UNINDEXED,
                entity_type UNINDEXED,
                title,
                name,
                description,
                content,
                tokenize='unicode61 remove_diacritics 2'
            );
        "#,
        )?;
        Ok(())
    }

    fn document_count(conn: &Connection) -> Result<usize> {
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM search_documents", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    fn load_vocabulary_from_index(conn: &Connection) -> Result<Vocabulary> {
        let mut vocabulary = Vocabulary::new();
        let mut stmt =
            conn.prepare("SELECT title, name, description, content FROM search_documents")?;
        let rows = stmt.query_map([], |row| {
            Ok([
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ])
        })?;
        for texts in rows {
            for text in texts? {
                vocabulary.add_text(&text);
            }
        }
        Ok(vocabulary)
    }

    fn upsert_document(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        fields: &SearchFields,
    ) -> Result<()> {
        let key = document_key(entity_type, entity_id);
        let conn = self.conn.lock().unwrap();
        conn.execute("BEGIN IMMEDIATE", [])?;

        let result = (|| -> Result<()> {
            conn.execute(
                "DELETE FROM search_documents WHERE doc_key = ?1",
                params![key],
            )?;
            conn.execute(
                "INSERT INTO search_documents (doc_key, entity_type, title, name, description, content) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    key,
                    entity_type.as_str(),
                    fields.title,
                    fields.name,
                    fields.description,
                    fields.content
                ],
            )?;
            Ok(())
        })();

        match result {
            Ok(()) => {
                conn.execute("COMMIT", [])?;
                let mut vocabulary = self.vocabulary.write().unwrap();
                vocabulary.add_text(&fields.title);
                vocabulary.add_text(&fields.name);
                vocabulary.add_text(&fields.description);
                vocabulary.add_text(&fields.content);
                debug!("Indexed {}", key);
                Ok(())
            }
            Err(e) => {
                if let Err(rollback_err) = conn.execute("ROLLBACK", []) {
                    warn!("Failed to rollback transaction: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    fn remove_document(&self, entity_type: EntityType, entity_id: i64) -> Result<()> {
        let key = document_key(entity_type, entity_id);
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute(
            "DELETE FROM search_documents WHERE doc_key = ?1",
            params![key],
        )?;
        // words stay in the vocabulary, a stale correction only costs a miss
        debug!("Removed {} ({} documents)", key, removed);
        Ok(())
    }

    /// OR of every query term and its vocabulary correction, each quoted.
    /// `None` when the text has no searchable terms.
    fn match_expression(&self, text: &str) -> Option<String> {
        let vocabulary = self.vocabulary.read().unwrap();
        let mut terms = BTreeSet::new();
        for term in tokenize(text) {
            if let Some(corrected) = vocabulary.correct_term(&term, self.tuning.max_edit_distance)
            {
                if corrected != term {
                    debug!("Query term corrected: '{}' -> '{}'", term, corrected);
                }
                terms.insert(corrected.to_string());
            }
            terms.insert(term);
        }

        if terms.is_empty() {
            return None;
        }
        Some(
            terms
                .iter()
                .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
                .collect::<Vec<_>>()
                .join(" OR "),
        )
    }

    fn search(&self, text: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let Some(expression) = self.match_expression(text) else {
            return Ok(Vec::new());
        };
        if max_results == 0 {
            return Ok(Vec::new());
        }

        // doc_key and entity_type carry no text, they get zero weight
        let sql = format!(
            "SELECT doc_key, bm25(search_documents, 0.0, 0.0, {t:.4}, {t:.4}, {b:.4}, {b:.4}) AS relevance \
             FROM search_documents \
             WHERE search_documents MATCH ?1 \
             ORDER BY relevance, doc_key \
             LIMIT ?2",
            t = self.tuning.title_weight,
            b = self.tuning.body_weight,
        );

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(params![expression, max_results as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;

        let mut hits = Vec::new();
        for row in rows {
            let (key, rank) = row?;
            match parse_document_key(&key) {
                Some((entity_type, entity_id)) => hits.push(SearchHit {
                    score: -rank,
                    entity_type,
                    entity_id,
                }),
                None => warn!("Skipping search document with malformed key '{}'", key),
            }
        }
        debug!("Query '{}' -> {} hits", expression, hits.len());
        Ok(hits)
    }

    fn all_document_keys(&self) -> Result<Vec<(EntityType, i64)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT doc_key FROM search_documents")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys
            .iter()
            .filter_map(|key| parse_document_key(key))
            .collect())
    }
}

impl SearchIndex for Fts5LevenshteinSearchIndex {
    fn upsert(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        fields: &SearchFields,
    ) -> CatalogResult<()> {
        self.upsert_document(entity_type, entity_id, fields)
            .map_err(external)
    }

    fn remove(&self, entity_type: EntityType, entity_id: i64) -> CatalogResult<()> {
        self.remove_document(entity_type, entity_id)
            .map_err(external)
    }

    fn query(&self, text: &str, max_results: usize) -> CatalogResult<Vec<SearchHit>> {
        self.search(text, max_results).map_err(external)
    }

    fn document_keys(&self) -> CatalogResult<Vec<(EntityType, i64)>> {
        self.all_document_keys().map_err(external)
    }

    fn stats(&self) -> CatalogResult<SearchIndexStats> {
        let documents = {
            let conn = self.conn.lock().unwrap();
            Self::document_count(&conn).map_err(external)?
        };
        Ok(SearchIndexStats {
            documents,
            vocabulary_words: self.vocabulary.read().unwrap().len(),
            engine: ENGINE_NAME.to_string(),
        })
    }
}
