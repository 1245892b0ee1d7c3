//! View-count ranking over the catalog database.

use super::period::PopularityPeriod;
use crate::catalog_store::{Song, SqliteCatalogStore};
use crate::error::CatalogResult;
use rusqlite::{params, Row};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopularityQuery {
    pub period: PopularityPeriod,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedSong {
    pub song: Song,
    pub views: u64,
}

/// Orders songs by the number of views inside a period.
///
/// Every existing song takes part, songs without views count as zero. Ties
/// are broken by ascending song id so paging is stable.
pub trait PopularityRanker: Send + Sync {
    fn rank(&self, query: &PopularityQuery) -> CatalogResult<Vec<RankedSong>> {
        self.rank_at(query, chrono::Utc::now().timestamp())
    }

    /// Ranks with the window ending at `now` (unix seconds).
    fn rank_at(&self, query: &PopularityQuery, now: i64) -> CatalogResult<Vec<RankedSong>>;
}

fn ranked_song_from_row(row: &Row) -> rusqlite::Result<RankedSong> {
    let views: i64 = row.get(5)?;
    Ok(RankedSong {
        song: Song {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            content: row.get(3)?,
            uploaded_by: row.get(4)?,
        },
        views: views as u64,
    })
}

impl PopularityRanker for SqliteCatalogStore {
    fn rank_at(&self, query: &PopularityQuery, now: i64) -> CatalogResult<Vec<RankedSong>> {
        if query.limit == 0 {
            return Ok(vec![]);
        }
        let limit = query.limit as i64;
        let offset = query.offset as i64;

        self.read(|conn| {
            let songs = match query.period.window_at(now) {
                Some((from, to)) => {
                    let mut stmt = conn.prepare_cached(
                        "SELECT s.id, s.title, s.description, s.content, s.uploaded_by, \
                                COALESCE(v.views, 0) AS views \
                         FROM songs s \
                         LEFT JOIN ( \
                             SELECT song_id, COUNT(*) AS views FROM view_events \
                             WHERE occurred_at >= ?1 AND occurred_at <= ?2 \
                             GROUP BY song_id \
                         ) v ON v.song_id = s.id \
                         ORDER BY views DESC, s.id ASC \
                         LIMIT ?3 OFFSET ?4",
                    )?;
                    let rows = stmt
                        .query_map(params![from, to, limit, offset], ranked_song_from_row)?
                        .collect::<Result<Vec<_>, _>>()?;
                    rows
                }
                None => {
                    let mut stmt = conn.prepare_cached(
                        "SELECT s.id, s.title, s.description, s.content, s.uploaded_by, \
                                COALESCE(v.views, 0) AS views \
                         FROM songs s \
                         LEFT JOIN ( \
                             SELECT song_id, COUNT(*) AS views FROM view_events \
                             GROUP BY song_id \
                         ) v ON v.song_id = s.id \
                         ORDER BY views DESC, s.id ASC \
                         LIMIT ?1 OFFSET ?2",
                    )?;
                    let rows = stmt
                        .query_map(params![limit, offset], ranked_song_from_row)?
                        .collect::<Result<Vec<_>, _>>()?;
                    rows
                }
            };
            Ok(songs)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_store::{CatalogStore, NewSong};
    use crate::popularity::SECONDS_PER_DAY;
    use tempfile::TempDir;

    const NOW: i64 = 1_700_000_000;

    fn create_tmp_store() -> (SqliteCatalogStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SqliteCatalogStore::new(dir.path().join("catalog.db"), 2).unwrap();
        (store, dir)
    }

    fn add_song(store: &SqliteCatalogStore, title: &str) -> i64 {
        store
            .create_song(
                NewSong {
                    title: title.to_string(),
                    content: "G D Em C".to_string(),
                    ..Default::default()
                },
                &[],
            )
            .unwrap()
            .song
            .id
    }

    fn query(period: PopularityPeriod, limit: usize, offset: usize) -> PopularityQuery {
        PopularityQuery {
            period,
            limit,
            offset,
        }
    }

    fn ids_and_views(ranked: &[RankedSong]) -> Vec<(i64, u64)> {
        ranked.iter().map(|r| (r.song.id, r.views)).collect()
    }

    #[test]
    fn counts_only_views_inside_window() {
        let (store, _dir) = create_tmp_store();
        let a = add_song(&store, "A");
        let b = add_song(&store, "B");

        store.record_view_at(a, NOW - 2 * SECONDS_PER_DAY).unwrap();
        store.record_view_at(a, NOW - 8 * SECONDS_PER_DAY).unwrap();
        store.record_view_at(b, NOW - 6 * SECONDS_PER_DAY).unwrap();
        store.record_view_at(b, NOW - 6 * SECONDS_PER_DAY).unwrap();

        let ranked = store
            .rank_at(&query(PopularityPeriod::Week, 10, 0), NOW)
            .unwrap();
        assert_eq!(ids_and_views(&ranked), vec![(b, 2), (a, 1)]);

        let ranked = store
            .rank_at(&query(PopularityPeriod::AllTime, 10, 0), NOW)
            .unwrap();
        assert_eq!(ids_and_views(&ranked), vec![(a, 2), (b, 2)]);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let (store, _dir) = create_tmp_store();
        let a = add_song(&store, "A");
        store.record_view_at(a, NOW - SECONDS_PER_DAY).unwrap();
        store.record_view_at(a, NOW).unwrap();

        let ranked = store
            .rank_at(&query(PopularityPeriod::Day, 10, 0), NOW)
            .unwrap();
        assert_eq!(ids_and_views(&ranked), vec![(a, 2)]);
    }

    #[test]
    fn unviewed_songs_rank_with_zero_by_id() {
        let (store, _dir) = create_tmp_store();
        let a = add_song(&store, "A");
        let b = add_song(&store, "B");
        let c = add_song(&store, "C");
        store.record_view_at(c, NOW - 3600).unwrap();

        let ranked = store
            .rank_at(&query(PopularityPeriod::Month, 10, 0), NOW)
            .unwrap();
        assert_eq!(ids_and_views(&ranked), vec![(c, 1), (a, 0), (b, 0)]);
    }

    #[test]
    fn pages_with_limit_and_offset() {
        let (store, _dir) = create_tmp_store();
        let ids: Vec<i64> = (0..5).map(|i| add_song(&store, &format!("S{}", i))).collect();

        let page = store
            .rank_at(&query(PopularityPeriod::Year, 2, 2), NOW)
            .unwrap();
        assert_eq!(
            page.iter().map(|r| r.song.id).collect::<Vec<_>>(),
            vec![ids[2], ids[3]]
        );

        assert!(store
            .rank_at(&query(PopularityPeriod::Year, 0, 0), NOW)
            .unwrap()
            .is_empty());
        assert!(store
            .rank_at(&query(PopularityPeriod::Year, 10, 50), NOW)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn deleted_songs_are_not_ranked() {
        let (store, _dir) = create_tmp_store();
        let a = add_song(&store, "A");
        let b = add_song(&store, "B");
        store.record_view_at(a, NOW).unwrap();
        store.delete_song(a).unwrap();

        let ranked = store
            .rank_at(&query(PopularityPeriod::AllTime, 10, 0), NOW)
            .unwrap();
        assert_eq!(ids_and_views(&ranked), vec![(b, 0)]);
    }
}
