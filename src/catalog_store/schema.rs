//! SQLite schema of the catalog database.
//!
//! Songs and artists use AUTOINCREMENT ids so an id is never handed out twice:
//! view events outlive the songs they reference.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
};

const SONGS_TABLE: Table = Table {
    name: "songs",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_autoincrement = true
        ),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text, non_null = true),
        sqlite_column!("content", &SqlType::Text, non_null = true),
        sqlite_column!("uploaded_by", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_songs_uploaded_by", "uploaded_by")],
    unique_constraints: &[],
};

const ARTISTS_TABLE: Table = Table {
    name: "artists",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_autoincrement = true
        ),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text, non_null = true),
        sqlite_column!("image_url", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_artists_name", "name")],
    unique_constraints: &[],
};

/// Song <-> Artist credit with its display position.
const ASSOCIATION_LINKS_TABLE: Table = Table {
    name: "association_links",
    columns: &[
        sqlite_column!(
            "song_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "songs",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!(
            "artist_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "artists",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("order_index", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_association_links_artist", "artist_id")],
    unique_constraints: &[&["song_id", "order_index"], &["song_id", "artist_id"]],
};

/// Append-only. No foreign key on purpose: events survive song deletion.
const VIEW_EVENTS_TABLE: Table = Table {
    name: "view_events",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_autoincrement = true
        ),
        sqlite_column!("song_id", &SqlType::Integer, non_null = true),
        sqlite_column!("occurred_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_view_events_song_time", "song_id, occurred_at"),
        ("idx_view_events_time", "occurred_at"),
    ],
    unique_constraints: &[],
};

pub const CATALOG_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        SONGS_TABLE,
        ARTISTS_TABLE,
        ASSOCIATION_LINKS_TABLE,
        VIEW_EVENTS_TABLE,
    ],
}];

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::{params, Connection};

    fn create_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        let schema = CATALOG_VERSIONED_SCHEMAS.last().unwrap();
        schema.create(&conn).unwrap();
        schema.validate(&conn).unwrap();
        conn
    }

    #[test]
    fn rejects_duplicate_order_index_for_same_song() {
        let conn = create_db();
        conn.execute(
            "INSERT INTO songs (title, description, content, uploaded_by) VALUES ('s', '', 'c', 1)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO artists (name, description, image_url) VALUES ('a1', '', '')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO artists (name, description, image_url) VALUES ('a2', '', '')",
            [],
        )
        .unwrap();

        conn.execute(
            "INSERT INTO association_links (song_id, artist_id, order_index) VALUES (?1, ?2, 0)",
            params![1, 1],
        )
        .unwrap();
        let duplicate_position = conn.execute(
            "INSERT INTO association_links (song_id, artist_id, order_index) VALUES (?1, ?2, 0)",
            params![1, 2],
        );
        assert!(duplicate_position.is_err());

        let duplicate_artist = conn.execute(
            "INSERT INTO association_links (song_id, artist_id, order_index) VALUES (?1, ?2, 1)",
            params![1, 1],
        );
        assert!(duplicate_artist.is_err());
    }

    #[test]
    fn deleting_song_cascades_to_links() {
        let conn = create_db();
        conn.execute(
            "INSERT INTO songs (title, description, content, uploaded_by) VALUES ('s', '', 'c', 1)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO artists (name, description, image_url) VALUES ('a', '', '')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO association_links (song_id, artist_id, order_index) VALUES (1, 1, 0)",
            [],
        )
        .unwrap();

        conn.execute("DELETE FROM songs WHERE id = 1", []).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM association_links", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
