//! Test fixture creation
//!
//! Builds a temporary key-value database and media directory holding a small,
//! well-known catalog. See `constants.rs` for the data.

use super::constants::*;
use anyhow::Result;
use music_catalog_server::catalog::{CatalogItem, CatalogSettings, SubscriptionLink};
use music_catalog_server::store::{
    FsObjectStore, KeyValueStore, ObjectStore, SqliteKeyValueStore,
};
use std::path::PathBuf;
use tempfile::TempDir;

fn song(id: &str, title: &str, artist: &str, album: &str, year: i64) -> CatalogItem {
    CatalogItem {
        item_id: id.to_string(),
        title: title.to_string(),
        artist: artist.to_string(),
        album: album.to_string(),
        year,
        asset_key: None,
    }
}

pub fn test_settings() -> CatalogSettings {
    CatalogSettings {
        music_table: MUSIC_TABLE.to_string(),
        subscription_table: SUBSCRIPTION_TABLE.to_string(),
        image_bucket: IMAGE_BUCKET.to_string(),
        ..Default::default()
    }
}

/// Creates the test catalog in a fresh temporary directory.
///
/// Returns the directory guard, the database path and the media root.
pub async fn create_test_catalog() -> Result<(TempDir, PathBuf, PathBuf)> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("catalog.db");
    let media_path = dir.path().join("media");
    std::fs::create_dir_all(&media_path)?;

    let settings = test_settings();
    let store = SqliteKeyValueStore::new(
        &db_path,
        settings.index_definitions(),
        settings.batch_get_max_keys,
    )?;

    let mut song_3 = song(SONG_3_ID, "Song C", ARTIST_Y, ALBUM_L, 2000);
    song_3.asset_key = Some("Artist_Y.jpg".to_string());
    let mut song_4 = song(SONG_4_ID, SONG_A_TITLE, ARTIST_Z, "Album N", 1999);
    song_4.asset_key = Some("Artist_Z.jpg".to_string());

    let songs = vec![
        song(SONG_1_ID, SONG_A_TITLE, ARTIST_X, ALBUM_L, 2000),
        song(SONG_2_ID, "Song B", ARTIST_X, "Album M", 2001),
        song_3,
        song_4,
    ];
    let batch = songs
        .iter()
        .map(|s| (s.item_id.clone(), s.to_item()))
        .collect();
    store.batch_put_items(MUSIC_TABLE, batch).await?;

    for item_id in [SONG_1_ID, STALE_SONG_ID] {
        let link = SubscriptionLink::new(TEST_USER_EMAIL, item_id);
        store
            .put_item(SUBSCRIPTION_TABLE, &link.key(), link.to_item())
            .await?;
    }

    let objects = FsObjectStore::new(&media_path);
    objects
        .put_object(IMAGE_BUCKET, "artistx.jpg", ARTIST_X_COVER)
        .await?;
    objects
        .put_object(IMAGE_BUCKET, "Artist_Z.jpg", ARTIST_Z_COVER)
        .await?;

    Ok((dir, db_path, media_path))
}
