use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use music_catalog_server::auth::Base64TokenVerifier;
use music_catalog_server::catalog::{CatalogService, DEFAULT_BATCH_GET_MAX_KEYS};
use music_catalog_server::config;
use music_catalog_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig};
use music_catalog_server::store::{FsObjectStore, SqliteKeyValueStore};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

fn parse_dir(s: &str) -> Result<PathBuf, String> {
    let path = parse_path(s)?;
    if !path.exists() {
        return Err(format!("Directory does not exist: {}", s));
    }
    if !path.is_dir() {
        return Err(format!("Path is not a directory: {}", s));
    }
    Ok(path)
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory containing the key-value database (catalog.db).
    /// Can also be specified in config file.
    #[clap(long, value_parser = parse_dir)]
    pub db_dir: Option<PathBuf>,

    /// Root of the object store holding cover images. Defaults to db_dir.
    #[clap(long, value_parser = parse_path)]
    pub media_path: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Table holding the music catalog.
    #[clap(long, default_value = "music")]
    pub music_table: String,

    /// Table holding (principal, item) subscription rows.
    #[clap(long, default_value = "subscribe")]
    pub subscription_table: String,

    /// Object store bucket holding cover images.
    #[clap(long, default_value = "covers")]
    pub image_bucket: String,

    /// Maximum number of keys per batched multi-get.
    #[clap(long, default_value_t = DEFAULT_BATCH_GET_MAX_KEYS)]
    pub batch_get_max_keys: usize,

    /// Timeout in milliseconds applied to each store call. Unbounded if not set.
    #[clap(long)]
    pub store_timeout_ms: Option<u64>,

    /// Seconds a token is still accepted after its expiry.
    #[clap(long, default_value_t = 0)]
    pub token_leeway_sec: u64,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_dir: args.db_dir.clone(),
            media_path: args.media_path.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            frontend_dir_path: args.frontend_dir_path.clone(),
            music_table: args.music_table.clone(),
            subscription_table: args.subscription_table.clone(),
            image_bucket: args.image_bucket.clone(),
            batch_get_max_keys: args.batch_get_max_keys,
            store_timeout_ms: args.store_timeout_ms,
            token_leeway_sec: args.token_leeway_sec,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  db_dir: {:?}", app_config.db_dir);
    info!("  media_path: {:?}", app_config.media_path);
    info!("  port: {}", app_config.port);
    info!(
        "  tables: {} / {}, bucket: {}, batch ceiling: {}",
        app_config.catalog.music_table,
        app_config.catalog.subscription_table,
        app_config.catalog.image_bucket,
        app_config.catalog.batch_get_max_keys
    );

    info!("Initializing metrics...");
    metrics::init_metrics();

    let kv_store = Arc::new(SqliteKeyValueStore::new(
        app_config.kv_db_path(),
        app_config.catalog.index_definitions(),
        app_config.catalog.batch_get_max_keys,
    )?);
    let object_store = Arc::new(FsObjectStore::new(&app_config.media_path));
    let catalog = CatalogService::new(kv_store, object_store, &app_config.catalog);
    let token_verifier = Arc::new(Base64TokenVerifier::new(app_config.token_leeway_sec));

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        metrics_port: app_config.metrics_port,
        frontend_dir_path: app_config.frontend_dir_path.clone(),
    };

    info!("Ready to serve at port {}!", app_config.port);
    info!("Metrics available at port {}!", app_config.metrics_port);
    run_server(server_config, catalog, token_verifier).await
}
