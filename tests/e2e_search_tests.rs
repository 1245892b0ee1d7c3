//! End-to-end tests for search index synchronization
//!
//! Catalog writes go through `CatalogService`, so every test also checks
//! that the index follows the catalog.

mod common;

use chords_catalog::catalog_store::{FieldUpdate, SongUpdate};
use chords_catalog::search::{EntityType, SearchFields};
use chords_catalog::service::ResolvedSearchHit;
use chords_catalog::{CatalogError, CatalogStore, SearchIndex};
use common::{FailingSearchIndex, TestCatalog};
use std::sync::Arc;

// =============================================================================
// Read-after-write
// =============================================================================

#[test]
fn test_created_entities_are_searchable_immediately() {
    let catalog = TestCatalog::new();
    let beatles = catalog.artist("The Beatles");
    let song = catalog.song("Yesterday", &[beatles.id]).song;

    assert!(catalog
        .hits_for("Yesterday")
        .contains(&(EntityType::Song, song.id)));
    assert!(catalog
        .hits_for("Beatles")
        .contains(&(EntityType::Artist, beatles.id)));
}

#[test]
fn test_typo_still_finds_title() {
    let catalog = TestCatalog::new();
    let beatles = catalog.artist("The Beatles");
    let song = catalog.song("Yesterday", &[beatles.id]).song;

    assert_eq!(catalog.hits_for("Yesterdy"), vec![(EntityType::Song, song.id)]);
    assert!(catalog
        .hits_for("Beatels")
        .contains(&(EntityType::Artist, beatles.id)));
}

#[test]
fn test_title_match_outranks_content_match() {
    let catalog = TestCatalog::new();
    let a = catalog.artist("Various");
    catalog.song("Evening Song", &[a.id]);
    catalog.song("Night Song", &[a.id]);
    let in_content = catalog
        .song_with_content("Morning Song", "[G] sunrise over the hill", &[a.id])
        .song;
    let in_title = catalog
        .song_with_content("Sunrise", "[C] [F] [G]", &[a.id])
        .song;

    let hits = catalog.service.search("sunrise").unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].entity_id, in_title.id);
    assert_eq!(hits[1].entity_id, in_content.id);
    assert!(hits[0].score > hits[1].score);
}

#[test]
fn test_updated_song_is_reindexed() {
    let catalog = TestCatalog::new();
    let a = catalog.artist("Toto");
    let song = catalog.song("Rosanna", &[a.id]).song;

    catalog
        .service
        .update_song(
            &catalog.uploader(),
            song.id,
            SongUpdate {
                title: FieldUpdate::Set("Africa".to_string()),
                ..Default::default()
            },
            None,
        )
        .unwrap();

    assert!(catalog.hits_for("Rosanna").is_empty());
    assert_eq!(catalog.hits_for("Africa"), vec![(EntityType::Song, song.id)]);
}

#[test]
fn test_index_entity_writes_given_fields() {
    let catalog = TestCatalog::new();
    let a = catalog.artist("Portishead");

    catalog
        .service
        .index_entity(
            EntityType::Artist,
            a.id,
            &SearchFields {
                name: "Beth Gibbons".to_string(),
                ..Default::default()
            },
        )
        .unwrap();

    assert_eq!(catalog.hits_for("Gibbons"), vec![(EntityType::Artist, a.id)]);
    assert!(catalog.hits_for("Portishead").is_empty());
}

#[test]
fn test_reindex_entity_refreshes_one_document() {
    let catalog = TestCatalog::new();
    let a = catalog.artist("Portishead");

    catalog
        .index
        .upsert(
            EntityType::Artist,
            a.id,
            &SearchFields {
                name: "Something Stale".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(catalog.hits_for("Portishead").is_empty());

    catalog
        .service
        .reindex_entity(EntityType::Artist, a.id)
        .unwrap();
    assert_eq!(
        catalog.hits_for("Portishead"),
        vec![(EntityType::Artist, a.id)]
    );

    let err = catalog
        .service
        .reindex_entity(EntityType::Song, 777)
        .unwrap_err();
    assert!(err.is_not_found());
}

// =============================================================================
// Deletion
// =============================================================================

#[test]
fn test_deleted_song_disappears_from_search() {
    let catalog = TestCatalog::new();
    let a = catalog.artist("Jeff Buckley");
    let song = catalog
        .song_with_content("Hallelujah", "[C] secret chord [Am] that David played", &[a.id])
        .song;
    assert!(!catalog.hits_for("Hallelujah").is_empty());

    catalog
        .service
        .delete_song(&catalog.uploader(), song.id)
        .unwrap();

    let hits = catalog.service.search("Hallelujah secret chord").unwrap();
    assert!(hits
        .iter()
        .all(|h| !(h.entity_type == EntityType::Song && h.entity_id == song.id)));
    assert_eq!(catalog.store.get_stats().unwrap().links, 0);
}

#[test]
fn test_deleted_artist_disappears_from_search() {
    let catalog = TestCatalog::new();
    let a = catalog.artist("Cocteau Twins");

    catalog.service.delete_artist(&catalog.admin(), a.id).unwrap();

    assert!(catalog.hits_for("Cocteau").is_empty());
}

#[test]
fn test_resolved_search_skips_missing_entities() {
    let catalog = TestCatalog::new();
    let a = catalog.artist("Massive Attack");
    let song = catalog.song("Teardrop", &[a.id]).song;

    // Removed behind the service's back, the document stays in the index
    catalog.store.delete_song(song.id).unwrap();
    assert_eq!(catalog.hits_for("Teardrop"), vec![(EntityType::Song, song.id)]);

    assert!(catalog.service.search_resolved("Teardrop").unwrap().is_empty());

    let resolved = catalog.service.search_resolved("Massive Attack").unwrap();
    assert!(matches!(
        &resolved[0],
        ResolvedSearchHit::Artist { artist, .. } if artist.id == a.id
    ));
}

// =============================================================================
// Reconciliation
// =============================================================================

#[test]
fn test_reindex_all_restores_and_prunes_documents() {
    let catalog = TestCatalog::new();
    let a = catalog.artist("Kraftwerk");
    let song = catalog.song("Autobahn", &[a.id]).song;

    // A stale document for a deleted song and a missing one for a live song
    let gone = catalog.song("Radioactivity", &[a.id]).song;
    catalog.store.delete_song(gone.id).unwrap();
    catalog.index.remove(EntityType::Song, song.id).unwrap();

    let report = catalog.service.reindex_all().unwrap();
    assert_eq!(report.songs, 1);
    assert_eq!(report.artists, 1);
    assert_eq!(report.removed, 1);

    assert_eq!(catalog.hits_for("Autobahn"), vec![(EntityType::Song, song.id)]);
    assert!(catalog.hits_for("Radioactivity").is_empty());

    let stats = catalog.service.stats().unwrap();
    assert_eq!(stats.search.documents, 2);
    assert_eq!(stats.catalog.songs, 1);
}

// =============================================================================
// Index failures
// =============================================================================

#[test]
fn test_catalog_writes_survive_index_outage() {
    let index = Arc::new(FailingSearchIndex::default());
    let catalog = TestCatalog::with_search_index(index.clone());

    let a = catalog.artist("Bon Iver");
    let song = catalog.song("Holocene", &[a.id]).song;
    catalog
        .service
        .update_song(
            &catalog.uploader(),
            song.id,
            SongUpdate {
                description: FieldUpdate::Set("Bon Iver, Bon Iver".to_string()),
                ..Default::default()
            },
            None,
        )
        .unwrap();
    catalog
        .service
        .delete_song(&catalog.uploader(), song.id)
        .unwrap();

    // artist upsert, song upsert, song upsert, song removal
    assert_eq!(index.attempts(), 4);
    assert_eq!(catalog.store.get_stats().unwrap().songs, 0);
    assert_eq!(catalog.service.get_artists().unwrap().len(), 1);
}

#[test]
fn test_explicit_index_operations_report_outage() {
    let index = Arc::new(FailingSearchIndex::default());
    let catalog = TestCatalog::with_search_index(index);
    let a = catalog.artist("Sigur Ros");

    let err = catalog.service.search("Sigur").unwrap_err();
    assert!(matches!(err, CatalogError::ExternalService(_)));

    let err = catalog
        .service
        .reindex_entity(EntityType::Artist, a.id)
        .unwrap_err();
    assert!(matches!(err, CatalogError::ExternalService(_)));

    let err = catalog
        .service
        .index_entity(EntityType::Artist, a.id, &SearchFields::from(&a))
        .unwrap_err();
    assert!(matches!(err, CatalogError::ExternalService(_)));

    let err = catalog.service.reindex_all().unwrap_err();
    assert!(matches!(err, CatalogError::ExternalService(_)));
}
