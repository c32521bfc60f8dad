//! Catalog Import Tool
//!
//! Loads a songs JSON file into the catalog table of the key-value database
//! and optionally copies cover images from a local directory into the image
//! bucket of the object store.

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use music_catalog_server::catalog::{CatalogItem, CatalogSettings};
use music_catalog_server::store::{
    FsObjectStore, Item, KeyValueStore, ObjectStore, SqliteKeyValueStore, MAX_BATCH_WRITE_ITEMS,
};

#[derive(Parser, Debug)]
#[command(name = "cli-import")]
#[command(about = "Import a songs JSON file into the music catalog")]
struct Args {
    /// Path to the songs JSON file ({"songs": [...]})
    #[arg(value_name = "SONGS_JSON")]
    songs_path: PathBuf,

    /// Directory containing the key-value database (catalog.db)
    #[arg(long)]
    db_dir: PathBuf,

    /// Root of the object store. Defaults to db_dir.
    #[arg(long)]
    media_path: Option<PathBuf>,

    /// Local directory holding cover images, matched by the file name of each song's img_url
    #[arg(long)]
    images_dir: Option<PathBuf>,

    #[arg(long, default_value = "music")]
    music_table: String,

    #[arg(long, default_value = "covers")]
    image_bucket: String,
}

#[derive(Deserialize, Debug)]
struct SongsFile {
    songs: Vec<Song>,
}

#[derive(Deserialize, Debug, Clone)]
struct Song {
    title: String,
    artist: String,
    album: String,
    #[serde(deserialize_with = "deserialize_year")]
    year: i64,
    #[serde(default)]
    img_url: Option<String>,
}

/// Years show up both as numbers and as numeric strings in exported files.
fn deserialize_year<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| serde::de::Error::custom(format!("invalid year {}", n))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid year '{}'", s))),
        other => Err(serde::de::Error::custom(format!("invalid year {}", other))),
    }
}

/// Deterministic identifier: re-importing the same song overwrites its record.
fn music_id(song: &Song) -> String {
    let mut hasher = Sha256::new();
    hasher.update(song.artist.as_bytes());
    hasher.update([0u8]);
    hasher.update(song.title.as_bytes());
    hasher.update([0u8]);
    hasher.update(song.album.as_bytes());
    hasher
        .finalize()
        .iter()
        .take(8)
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Stored cover key: the artist name with spaces replaced by underscores.
fn stored_asset_key(artist: &str) -> String {
    format!("{}.jpg", artist.replace(' ', "_"))
}

fn to_catalog_item(song: &Song) -> CatalogItem {
    CatalogItem {
        item_id: music_id(song),
        title: song.title.clone(),
        artist: song.artist.clone(),
        album: song.album.clone(),
        year: song.year,
        asset_key: Some(stored_asset_key(&song.artist)),
    }
}

fn load_songs(path: &Path) -> Result<Vec<Song>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read songs file: {:?}", path))?;
    let file: SongsFile = serde_json::from_str(&content)
        .with_context(|| format!("Invalid songs JSON in {:?}", path))?;
    Ok(file.songs)
}

/// Writes all songs, [`MAX_BATCH_WRITE_ITEMS`] per batch. Returns the number of records written.
async fn import_songs(store: &dyn KeyValueStore, table: &str, songs: &[Song]) -> Result<usize> {
    let mut written = 0;
    for chunk in songs.chunks(MAX_BATCH_WRITE_ITEMS) {
        let batch: Vec<(String, Item)> = chunk
            .iter()
            .map(to_catalog_item)
            .map(|item| (item.item_id.clone(), item.to_item()))
            .collect();
        store.batch_put_items(table, batch).await?;
        written += chunk.len();
        info!("Batch of {} inserted ({} total)", chunk.len(), written);
    }
    Ok(written)
}

fn source_file_name(img_url: &str) -> Option<&str> {
    let without_query = img_url.split(['?', '#']).next()?;
    without_query
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
}

/// Copies each song's cover from `images_dir` into the bucket. Covers are
/// shared per artist so each artist is uploaded once. Returns the number of
/// images uploaded.
async fn import_images(
    objects: &dyn ObjectStore,
    bucket: &str,
    images_dir: &Path,
    songs: &[Song],
) -> Result<usize> {
    let mut uploaded = std::collections::HashSet::new();
    for song in songs {
        let Some(file_name) = song.img_url.as_deref().and_then(source_file_name) else {
            continue;
        };
        let key = stored_asset_key(&song.artist);
        if uploaded.contains(&key) {
            continue;
        }
        let source = images_dir.join(file_name);
        let data = match tokio::fs::read(&source).await {
            Ok(data) => data,
            Err(err) => {
                warn!("Skipping cover for {}: {:?}: {}", song.artist, source, err);
                continue;
            }
        };
        objects.put_object(bucket, &key, &data).await?;
        uploaded.insert(key);
    }
    Ok(uploaded.len())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    info!("Catalog Import Tool");
    info!("===================");
    info!("Songs file: {}", args.songs_path.display());
    info!("Database dir: {}", args.db_dir.display());

    if !args.db_dir.is_dir() {
        bail!("Database directory does not exist: {:?}", args.db_dir);
    }

    let songs = load_songs(&args.songs_path)?;
    info!("Loaded {} songs", songs.len());

    let settings = CatalogSettings {
        music_table: args.music_table.clone(),
        image_bucket: args.image_bucket.clone(),
        ..Default::default()
    };
    let store = SqliteKeyValueStore::new(
        args.db_dir.join("catalog.db"),
        settings.index_definitions(),
        settings.batch_get_max_keys,
    )?;

    let written = import_songs(&store, &settings.music_table, &songs).await?;

    let mut images = 0;
    if let Some(images_dir) = &args.images_dir {
        let media_path = args.media_path.as_ref().unwrap_or(&args.db_dir);
        let objects = FsObjectStore::new(media_path);
        images = import_images(&objects, &settings.image_bucket, images_dir, &songs).await?;
    }

    info!("");
    info!("Import Summary");
    info!("==============");
    info!("Songs imported: {}", written);
    info!("Images imported: {}", images);

    Ok(())
}
