mod file_config;

pub use file_config::{CatalogConfig, FileConfig};

use crate::auth::MAX_TOKEN_LEEWAY_SEC;
use crate::catalog::{CatalogSettings, DEFAULT_BATCH_GET_MAX_KEYS};
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub media_path: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub music_table: String,
    pub subscription_table: String,
    pub image_bucket: String,
    pub batch_get_max_keys: usize,
    pub store_timeout_ms: Option<u64>,
    pub token_leeway_sec: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        let catalog = CatalogSettings::default();
        CliConfig {
            db_dir: None,
            media_path: None,
            port: 3001,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::Path,
            frontend_dir_path: None,
            music_table: catalog.music_table,
            subscription_table: catalog.subscription_table,
            image_bucket: catalog.image_bucket,
            batch_get_max_keys: DEFAULT_BATCH_GET_MAX_KEYS,
            store_timeout_ms: None,
            token_leeway_sec: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub media_path: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub token_leeway_sec: u64,

    // Catalog settings
    pub catalog: CatalogSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        // TOML overrides CLI for each field
        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        // Validate db_dir exists
        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let media_path = file
            .media_path
            .map(PathBuf::from)
            .or_else(|| cli.media_path.clone())
            .unwrap_or_else(|| db_dir.clone());

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let store_timeout = file
            .store_timeout_ms
            .or(cli.store_timeout_ms)
            .map(Duration::from_millis);
        let token_leeway_sec = file.token_leeway_sec.unwrap_or(cli.token_leeway_sec);
        if token_leeway_sec > MAX_TOKEN_LEEWAY_SEC {
            bail!(
                "token_leeway_sec must be at most {}, got {}",
                MAX_TOKEN_LEEWAY_SEC,
                token_leeway_sec
            );
        }

        // Catalog settings - [catalog] section overrides CLI
        let catalog_file = file.catalog.unwrap_or_default();
        let batch_get_max_keys = catalog_file
            .batch_get_max_keys
            .unwrap_or(cli.batch_get_max_keys);
        if batch_get_max_keys == 0 {
            bail!("batch_get_max_keys must be at least 1");
        }
        let catalog = CatalogSettings {
            music_table: catalog_file
                .music_table
                .unwrap_or_else(|| cli.music_table.clone()),
            subscription_table: catalog_file
                .subscription_table
                .unwrap_or_else(|| cli.subscription_table.clone()),
            image_bucket: catalog_file
                .image_bucket
                .unwrap_or_else(|| cli.image_bucket.clone()),
            batch_get_max_keys,
            store_timeout,
        };

        Ok(Self {
            db_dir,
            media_path,
            port,
            metrics_port,
            logging_level,
            frontend_dir_path,
            token_leeway_sec,
            catalog,
        })
    }

    pub fn kv_db_path(&self) -> PathBuf {
        self.db_dir.join("catalog.db")
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
