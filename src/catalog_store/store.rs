//! SQLite-backed catalog store.
//!
//! All writes go through a single connection guarded by a mutex and run inside
//! `BEGIN IMMEDIATE` transactions. Reads are spread round-robin over a pool of
//! read-only connections. The database runs in WAL mode, so a read issued after
//! a write has returned always observes it.

use super::associations::{compact_links, ensure_artists_exist, query_links, write_links};
use super::models::*;
use super::schema::CATALOG_VERSIONED_SCHEMAS;
use super::trait_def::CatalogStore;
use super::validation::{
    validate_artist_ids, validate_artist_update, validate_new_artist, validate_new_song,
    validate_song_update,
};
use crate::error::{CatalogError, CatalogResult};
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_READ_POOL_SIZE: usize = 4;

/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SONG_COLUMNS: &str = "id, title, description, content, uploaded_by";
const ARTIST_COLUMNS: &str = "id, name, description, image_url";

#[derive(Clone, Debug)]
pub struct SqliteCatalogStore {
    read_pool: Vec<Arc<Mutex<Connection>>>,
    write_conn: Arc<Mutex<Connection>>,
    read_index: Arc<AtomicUsize>,
}

/// Creates the schema on an empty database, otherwise checks that the stored
/// version and tables match the latest schema.
fn create_or_validate_schema(conn: &mut Connection) -> Result<()> {
    let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;

    let latest_version = CATALOG_VERSIONED_SCHEMAS.len() - 1;
    let latest_schema = &CATALOG_VERSIONED_SCHEMAS[latest_version];

    let table_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |r| r.get(0),
    )?;

    if table_count == 0 {
        info!("Creating catalog db schema at version {}", latest_version);
        let tx = conn.transaction()?;
        latest_schema.create(&tx)?;
        tx.commit()?;
        return Ok(());
    }

    if db_version < BASE_DB_VERSION as i64 {
        bail!(
            "Database has user_version {} which is not a catalog database",
            db_version
        );
    }
    let current_version = (db_version - BASE_DB_VERSION as i64) as usize;
    if current_version != latest_version {
        bail!(
            "Catalog db version {} is not supported, expected version {}",
            current_version,
            latest_version
        );
    }

    latest_schema
        .validate(conn)
        .context("Catalog db schema validation failed")?;
    Ok(())
}

fn song_from_row(row: &Row) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        content: row.get(3)?,
        uploaded_by: row.get(4)?,
    })
}

fn artist_from_row(row: &Row) -> rusqlite::Result<Artist> {
    Ok(Artist {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        image_url: row.get(3)?,
    })
}

pub(super) fn query_song(conn: &Connection, id: SongId) -> CatalogResult<Option<Song>> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM songs WHERE id = ?1", SONG_COLUMNS),
            params![id],
            song_from_row,
        )
        .optional()?)
}

fn query_artist(conn: &Connection, id: ArtistId) -> CatalogResult<Option<Artist>> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM artists WHERE id = ?1", ARTIST_COLUMNS),
            params![id],
            artist_from_row,
        )
        .optional()?)
}

/// Credited artists of the song, ordered by position. Empty for a missing song.
fn query_credits(conn: &Connection, song_id: SongId) -> CatalogResult<Vec<CreditedArtist>> {
    let mut stmt = conn.prepare_cached(
        "SELECT a.id, a.name, a.description, a.image_url, l.order_index \
         FROM association_links l \
         INNER JOIN artists a ON a.id = l.artist_id \
         WHERE l.song_id = ?1 \
         ORDER BY l.order_index",
    )?;
    let credits = stmt
        .query_map(params![song_id], |row| {
            Ok(CreditedArtist {
                order_index: row.get(4)?,
                artist: artist_from_row(row)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(credits)
}

fn count_rows(conn: &Connection, table: &str) -> CatalogResult<usize> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| {
        r.get(0)
    })?;
    Ok(count as usize)
}

impl SqliteCatalogStore {
    /// Open (or create) the catalog database at `db_path`.
    ///
    /// An existing database must be at the latest schema version and is
    /// validated before use. `read_pool_size` is clamped to at least 1.
    pub fn new<P: AsRef<Path>>(db_path: P, read_pool_size: usize) -> Result<Self> {
        let db_path = db_path.as_ref();

        let mut write_conn = Connection::open_with_flags(
            db_path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open catalog database {:?}", db_path))?;
        write_conn.busy_timeout(BUSY_TIMEOUT)?;
        write_conn.pragma_update(None, "foreign_keys", "ON")?;

        create_or_validate_schema(&mut write_conn)?;

        write_conn.pragma_update(None, "journal_mode", "WAL")?;

        let stats = Self::stats_on(&write_conn)?;
        info!(
            "Opened catalog {:?}: {} songs, {} artists, {} links, {} view events",
            db_path, stats.songs, stats.artists, stats.links, stats.view_events
        );

        let read_pool_size = read_pool_size.max(1);
        let mut read_pool = Vec::with_capacity(read_pool_size);
        for _ in 0..read_pool_size {
            let read_conn = Connection::open_with_flags(
                db_path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            read_conn.busy_timeout(BUSY_TIMEOUT)?;
            read_pool.push(Arc::new(Mutex::new(read_conn)));
        }

        Ok(SqliteCatalogStore {
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_pool,
            read_index: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn get_read_conn(&self) -> Arc<Mutex<Connection>> {
        let index = self.read_index.fetch_add(1, Ordering::SeqCst) % self.read_pool.len();
        self.read_pool[index].clone()
    }

    pub(crate) fn read<T>(&self, f: impl FnOnce(&Connection) -> CatalogResult<T>) -> CatalogResult<T> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        f(&conn)
    }

    /// Like `read`, but every statement `f` runs sees the same snapshot of the
    /// database.
    pub(crate) fn read_snapshot<T>(
        &self,
        f: impl FnOnce(&Connection) -> CatalogResult<T>,
    ) -> CatalogResult<T> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        conn.execute_batch("BEGIN")?;

        match f(&conn) {
            Ok(value) => {
                conn.execute_batch("COMMIT")?;
                Ok(value)
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// Runs `f` inside an immediate write transaction, rolling back on error.
    pub(super) fn write_transaction<T>(
        &self,
        f: impl FnOnce(&Connection) -> CatalogResult<T>,
    ) -> CatalogResult<T> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute("BEGIN IMMEDIATE", [])?;

        match f(&conn) {
            Ok(value) => {
                conn.execute("COMMIT", [])?;
                Ok(value)
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }

    fn stats_on(conn: &Connection) -> CatalogResult<StoreStats> {
        Ok(StoreStats {
            songs: count_rows(conn, "songs")?,
            artists: count_rows(conn, "artists")?,
            links: count_rows(conn, "association_links")?,
            view_events: count_rows(conn, "view_events")?,
        })
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn create_song(&self, song: NewSong, artist_ids: &[ArtistId]) -> CatalogResult<SongWithLinks> {
        validate_new_song(&song)?;
        validate_artist_ids(artist_ids)?;

        let created = self.write_transaction(|conn| {
            ensure_artists_exist(conn, artist_ids)?;
            conn.execute(
                "INSERT INTO songs (title, description, content, uploaded_by) VALUES (?1, ?2, ?3, ?4)",
                params![song.title, song.description, song.content, song.uploaded_by],
            )?;
            let song = Song {
                id: conn.last_insert_rowid(),
                title: song.title,
                description: song.description,
                content: song.content,
                uploaded_by: song.uploaded_by,
            };
            let links = write_links(conn, song.id, artist_ids)?;
            Ok(SongWithLinks { song, links })
        })?;

        debug!(
            "Created song {} with {} artist links",
            created.song.id,
            created.links.len()
        );
        Ok(created)
    }

    fn get_song(&self, id: SongId) -> CatalogResult<Song> {
        self.read(|conn| query_song(conn, id)?.ok_or_else(|| CatalogError::not_found("Song", id)))
    }

    fn get_song_with_associations(&self, id: SongId) -> CatalogResult<SongWithLinks> {
        self.read_snapshot(|conn| {
            let song = query_song(conn, id)?.ok_or_else(|| CatalogError::not_found("Song", id))?;
            let links = query_links(conn, id)?;
            Ok(SongWithLinks { song, links })
        })
    }

    fn get_song_with_artists(&self, id: SongId) -> CatalogResult<SongWithArtists> {
        self.read_snapshot(|conn| {
            let song = query_song(conn, id)?.ok_or_else(|| CatalogError::not_found("Song", id))?;
            let artists = query_credits(conn, id)?;
            Ok(SongWithArtists { song, artists })
        })
    }

    fn get_credits(&self, song_ids: &[SongId]) -> CatalogResult<HashMap<SongId, Vec<CreditedArtist>>> {
        if song_ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.read_snapshot(|conn| {
            let mut credits = HashMap::with_capacity(song_ids.len());
            for song_id in song_ids {
                if !credits.contains_key(song_id) {
                    credits.insert(*song_id, query_credits(conn, *song_id)?);
                }
            }
            Ok(credits)
        })
    }

    fn update_song(&self, id: SongId, update: SongUpdate) -> CatalogResult<Song> {
        validate_song_update(&update)?;

        self.write_transaction(|conn| {
            let mut song =
                query_song(conn, id)?.ok_or_else(|| CatalogError::not_found("Song", id))?;
            if update.is_empty() {
                return Ok(song);
            }
            update.apply_to(&mut song);
            conn.execute(
                "UPDATE songs SET title = ?1, description = ?2, content = ?3 WHERE id = ?4",
                params![song.title, song.description, song.content, id],
            )?;
            Ok(song)
        })
    }

    fn update_song_with_credits(
        &self,
        id: SongId,
        update: SongUpdate,
        artist_ids: Option<&[ArtistId]>,
    ) -> CatalogResult<SongWithLinks> {
        validate_song_update(&update)?;
        if let Some(artist_ids) = artist_ids {
            validate_artist_ids(artist_ids)?;
        }

        let updated = self.write_transaction(|conn| {
            let mut song =
                query_song(conn, id)?.ok_or_else(|| CatalogError::not_found("Song", id))?;
            let links = match artist_ids {
                Some(artist_ids) => {
                    ensure_artists_exist(conn, artist_ids)?;
                    write_links(conn, id, artist_ids)?
                }
                None => query_links(conn, id)?,
            };
            if !update.is_empty() {
                update.apply_to(&mut song);
                conn.execute(
                    "UPDATE songs SET title = ?1, description = ?2, content = ?3 WHERE id = ?4",
                    params![song.title, song.description, song.content, id],
                )?;
            }
            Ok(SongWithLinks { song, links })
        })?;

        debug!("Updated song {} ({} artist links)", id, updated.links.len());
        Ok(updated)
    }

    fn delete_song(&self, id: SongId) -> CatalogResult<()> {
        self.write_transaction(|conn| {
            let deleted = conn.execute("DELETE FROM songs WHERE id = ?1", params![id])?;
            if deleted == 0 {
                return Err(CatalogError::not_found("Song", id));
            }
            Ok(())
        })?;
        debug!("Deleted song {}", id);
        Ok(())
    }

    fn list_songs(&self) -> CatalogResult<Vec<Song>> {
        self.read(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {} FROM songs ORDER BY id", SONG_COLUMNS))?;
            let songs = stmt
                .query_map([], song_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(songs)
        })
    }

    fn create_artist(&self, artist: NewArtist) -> CatalogResult<Artist> {
        validate_new_artist(&artist)?;

        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "INSERT INTO artists (name, description, image_url) VALUES (?1, ?2, ?3)",
            params![artist.name, artist.description, artist.image_url],
        )?;
        let created = Artist {
            id: conn.last_insert_rowid(),
            name: artist.name,
            description: artist.description,
            image_url: artist.image_url,
        };
        debug!("Created artist {} ({})", created.id, created.name);
        Ok(created)
    }

    fn get_artist(&self, id: ArtistId) -> CatalogResult<Artist> {
        self.read(|conn| {
            query_artist(conn, id)?.ok_or_else(|| CatalogError::not_found("Artist", id))
        })
    }

    fn get_artists(&self) -> CatalogResult<Vec<Artist>> {
        self.read(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {} FROM artists ORDER BY id", ARTIST_COLUMNS))?;
            let artists = stmt
                .query_map([], artist_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(artists)
        })
    }

    fn get_artist_songs(&self, artist_id: ArtistId) -> CatalogResult<Vec<SongWithLinks>> {
        self.read_snapshot(|conn| {
            if query_artist(conn, artist_id)?.is_none() {
                return Err(CatalogError::not_found("Artist", artist_id));
            }
            let mut stmt = conn.prepare(
                "SELECT s.id, s.title, s.description, s.content, s.uploaded_by \
                 FROM songs s \
                 INNER JOIN association_links l ON l.song_id = s.id \
                 WHERE l.artist_id = ?1 \
                 ORDER BY s.id",
            )?;
            let songs = stmt
                .query_map(params![artist_id], song_from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            songs
                .into_iter()
                .map(|song| -> CatalogResult<SongWithLinks> {
                    let links = query_links(conn, song.id)?;
                    Ok(SongWithLinks { song, links })
                })
                .collect()
        })
    }

    fn update_artist(&self, id: ArtistId, update: ArtistUpdate) -> CatalogResult<Artist> {
        validate_artist_update(&update)?;

        self.write_transaction(|conn| {
            let mut artist =
                query_artist(conn, id)?.ok_or_else(|| CatalogError::not_found("Artist", id))?;
            if update.is_empty() {
                return Ok(artist);
            }
            update.apply_to(&mut artist);
            conn.execute(
                "UPDATE artists SET name = ?1, description = ?2, image_url = ?3 WHERE id = ?4",
                params![artist.name, artist.description, artist.image_url, id],
            )?;
            Ok(artist)
        })
    }

    fn delete_artist(&self, id: ArtistId) -> CatalogResult<()> {
        let affected_songs = self.write_transaction(|conn| {
            let affected_songs: Vec<SongId> = {
                let mut stmt = conn.prepare(
                    "SELECT song_id FROM association_links WHERE artist_id = ?1 ORDER BY song_id",
                )?;
                let ids = stmt
                    .query_map(params![id], |r| r.get(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                ids
            };

            let deleted = conn.execute("DELETE FROM artists WHERE id = ?1", params![id])?;
            if deleted == 0 {
                return Err(CatalogError::not_found("Artist", id));
            }

            for song_id in &affected_songs {
                compact_links(conn, *song_id)?;
            }
            Ok(affected_songs)
        })?;

        debug!(
            "Deleted artist {}, compacted links of {} songs",
            id,
            affected_songs.len()
        );
        Ok(())
    }

    fn record_view(&self, song_id: SongId) -> CatalogResult<ViewEvent> {
        self.record_view_at(song_id, chrono::Utc::now().timestamp())
    }

    fn record_view_at(&self, song_id: SongId, occurred_at: i64) -> CatalogResult<ViewEvent> {
        let conn = self.write_conn.lock().unwrap();
        // existence check and insert in one statement, so a concurrent delete
        // cannot slip in between
        let inserted = conn.execute(
            "INSERT INTO view_events (song_id, occurred_at) \
             SELECT ?1, ?2 WHERE EXISTS (SELECT 1 FROM songs WHERE id = ?1)",
            params![song_id, occurred_at],
        )?;
        if inserted == 0 {
            return Err(CatalogError::not_found("Song", song_id));
        }
        Ok(ViewEvent {
            id: conn.last_insert_rowid(),
            song_id,
            occurred_at,
        })
    }

    fn get_stats(&self) -> CatalogResult<StoreStats> {
        self.read(Self::stats_on)
    }
}
