//! Ordered Song <-> Artist credits.
//!
//! A song's links are always rewritten as a whole: the new ordered artist list
//! is computed in memory, then the old rows are deleted and the new ones
//! inserted inside the caller's transaction. That keeps positions dense and
//! unique without juggling the `(song_id, order_index)` constraint row by row.

use super::models::{ArtistId, AssociationLink, SongId};
use super::store::{query_song, SqliteCatalogStore};
use super::trait_def::AssociationManager;
use super::validation::validate_artist_ids;
use crate::error::{CatalogError, CatalogResult};
use rusqlite::{params, Connection};
use tracing::debug;

pub(super) fn query_links(conn: &Connection, song_id: SongId) -> CatalogResult<Vec<AssociationLink>> {
    let mut stmt = conn.prepare_cached(
        "SELECT song_id, artist_id, order_index FROM association_links \
         WHERE song_id = ?1 ORDER BY order_index",
    )?;
    let links = stmt
        .query_map(params![song_id], |row| {
            Ok(AssociationLink {
                song_id: row.get(0)?,
                artist_id: row.get(1)?,
                order_index: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(links)
}

fn ensure_song_exists(conn: &Connection, song_id: SongId) -> CatalogResult<()> {
    if query_song(conn, song_id)?.is_none() {
        return Err(CatalogError::not_found("Song", song_id));
    }
    Ok(())
}

/// Fails with `NotFound` on the first id that has no artist row.
pub(super) fn ensure_artists_exist(conn: &Connection, artist_ids: &[ArtistId]) -> CatalogResult<()> {
    let mut stmt = conn.prepare_cached("SELECT EXISTS (SELECT 1 FROM artists WHERE id = ?1)")?;
    for artist_id in artist_ids {
        let exists: bool = stmt.query_row(params![artist_id], |r| r.get(0))?;
        if !exists {
            return Err(CatalogError::not_found("Artist", *artist_id));
        }
    }
    Ok(())
}

/// Replaces the song's links with `artist_ids`, positioned by slice index.
pub(super) fn write_links(
    conn: &Connection,
    song_id: SongId,
    artist_ids: &[ArtistId],
) -> CatalogResult<Vec<AssociationLink>> {
    conn.execute(
        "DELETE FROM association_links WHERE song_id = ?1",
        params![song_id],
    )?;

    let mut stmt = conn.prepare_cached(
        "INSERT INTO association_links (song_id, artist_id, order_index) VALUES (?1, ?2, ?3)",
    )?;
    let mut links = Vec::with_capacity(artist_ids.len());
    for (order_index, artist_id) in artist_ids.iter().enumerate() {
        let order_index = order_index as u32;
        stmt.execute(params![song_id, artist_id, order_index])?;
        links.push(AssociationLink {
            song_id,
            artist_id: *artist_id,
            order_index,
        });
    }
    Ok(links)
}

/// Closes gaps in the song's positions, keeping relative order.
pub(super) fn compact_links(conn: &Connection, song_id: SongId) -> CatalogResult<Vec<AssociationLink>> {
    let remaining: Vec<ArtistId> = query_links(conn, song_id)?
        .into_iter()
        .map(|l| l.artist_id)
        .collect();
    write_links(conn, song_id, &remaining)
}

impl AssociationManager for SqliteCatalogStore {
    fn attach(
        &self,
        song_id: SongId,
        artist_id: ArtistId,
        order_index: u32,
    ) -> CatalogResult<Vec<AssociationLink>> {
        let links = self.write_transaction(|conn| {
            ensure_song_exists(conn, song_id)?;
            ensure_artists_exist(conn, &[artist_id])?;

            let mut artist_ids: Vec<ArtistId> = query_links(conn, song_id)?
                .into_iter()
                .map(|l| l.artist_id)
                .collect();
            if artist_ids.contains(&artist_id) {
                return Err(CatalogError::Conflict(format!(
                    "Artist {} is already credited on song {}",
                    artist_id, song_id
                )));
            }
            if order_index as usize > artist_ids.len() {
                return Err(CatalogError::validation(format!(
                    "Position {} is out of range, song {} has {} artists",
                    order_index,
                    song_id,
                    artist_ids.len()
                )));
            }

            artist_ids.insert(order_index as usize, artist_id);
            write_links(conn, song_id, &artist_ids)
        })?;

        debug!(
            "Attached artist {} to song {} at position {}",
            artist_id, song_id, order_index
        );
        Ok(links)
    }

    fn detach(&self, song_id: SongId, artist_id: ArtistId) -> CatalogResult<Vec<AssociationLink>> {
        let links = self.write_transaction(|conn| {
            ensure_song_exists(conn, song_id)?;

            let current = query_links(conn, song_id)?;
            if !current.iter().any(|l| l.artist_id == artist_id) {
                return Err(CatalogError::not_found(
                    "Association",
                    format!("{}/{}", song_id, artist_id),
                ));
            }

            let remaining: Vec<ArtistId> = current
                .into_iter()
                .map(|l| l.artist_id)
                .filter(|id| *id != artist_id)
                .collect();
            write_links(conn, song_id, &remaining)
        })?;

        debug!("Detached artist {} from song {}", artist_id, song_id);
        Ok(links)
    }

    fn replace_all(
        &self,
        song_id: SongId,
        artist_ids: &[ArtistId],
    ) -> CatalogResult<Vec<AssociationLink>> {
        validate_artist_ids(artist_ids)?;

        let links = self.write_transaction(|conn| {
            ensure_song_exists(conn, song_id)?;
            ensure_artists_exist(conn, artist_ids)?;
            write_links(conn, song_id, artist_ids)
        })?;

        debug!("Replaced links of song {} with {:?}", song_id, artist_ids);
        Ok(links)
    }

    fn get_links(&self, song_id: SongId) -> CatalogResult<Vec<AssociationLink>> {
        self.read_snapshot(|conn| {
            ensure_song_exists(conn, song_id)?;
            query_links(conn, song_id)
        })
    }
}
