mod api;
mod cli;
mod metrics;
mod shutdown;
mod state;

use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use packharvest_core::{
    collect_stats, load_config, validate_config, Codec, Config, CursorStore, LocalStore,
    LogFormat, PackStore, PipelineDriver, StickerApi, StickerlyClient, StoreBackend,
    SupabaseStore, WebpToolsCodec,
};

use api::create_router;
use cli::{Cli, Command};
use state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logging is configured from the file, so config errors go to stderr.
    let config = match load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli.command, config).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn load(path: &Path) -> Result<Config> {
    let config =
        load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?;
    validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

fn init_logging(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("{},tower_http=info", config.logging.level)))
        .context("Invalid logging.level")?;

    let file_layer = match &config.logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            Some(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        }
        None => None,
    };

    // stdout is reserved for command output.
    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    match config.logging.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
    Ok(())
}

/// One-shot or continuous harvest.
#[derive(Debug, Clone, Copy)]
enum Harvest {
    Recommended,
    Keywords,
    Full,
    Continuous,
}

async fn run(command: Command, config: Config) -> Result<()> {
    info!(version = VERSION, command = command.as_str(), "Starting packharvest");

    let (store, cursor_store) = open_store(&config)?;
    info!(backend = store.name(), "Store opened");

    match command {
        Command::Stats => print_stats(&config, store, cursor_store).await,
        Command::Recommended => harvest(Harvest::Recommended, config, store, cursor_store).await,
        Command::Keywords => harvest(Harvest::Keywords, config, store, cursor_store).await,
        Command::Full => harvest(Harvest::Full, config, store, cursor_store).await,
        Command::Continuous => harvest(Harvest::Continuous, config, store, cursor_store).await,
    }
}

async fn print_stats(
    config: &Config,
    store: Arc<dyn PackStore>,
    cursor_store: Arc<dyn CursorStore>,
) -> Result<()> {
    let report = collect_stats(config, store.as_ref(), cursor_store.as_ref())
        .await
        .context("Failed to collect stats")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn harvest(
    mode: Harvest,
    config: Config,
    store: Arc<dyn PackStore>,
    cursor_store: Arc<dyn CursorStore>,
) -> Result<()> {
    let api: Arc<dyn StickerApi> = Arc::new(
        StickerlyClient::new(config.upstream.clone()).context("Failed to create upstream client")?,
    );
    let codec: Arc<dyn Codec> = Arc::new(WebpToolsCodec::new(config.codec.clone()));
    codec
        .validate()
        .await
        .context("WebP tools unavailable, check the [codec] paths")?;
    info!("WebP tools validated");

    let mut driver = PipelineDriver::build(&config, api, codec, store, cursor_store)
        .await
        .context("Failed to initialize pipeline")?;

    let cancel = shutdown::install_signal_handler();

    // Status server runs until the harvest finishes.
    let server_stop = CancellationToken::new();
    let server = if config.server.enabled {
        let state = Arc::new(AppState::new(config.clone(), driver.subscribe()));
        let addr = SocketAddr::new(config.server.host, config.server.port);
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;
        info!("Status server listening on {}", addr);

        let stop = server_stop.clone();
        Some(tokio::spawn(async move {
            axum::serve(listener, create_router(state))
                .with_graceful_shutdown(stop.cancelled_owned())
                .await
        }))
    } else {
        None
    };

    let stats = match mode {
        Harvest::Recommended => driver.run_recommended(&cancel).await,
        Harvest::Keywords => driver.run_keywords(&cancel).await,
        Harvest::Full => driver.run_full(&cancel).await,
        Harvest::Continuous => driver.run_continuous(&cancel).await,
    };

    info!(
        session = %stats.session_id,
        mode = ?mode,
        processed = stats.processed,
        failed = stats.failed,
        interrupted = cancel.is_cancelled(),
        "Harvest finished"
    );

    server_stop.cancel();
    if let Some(handle) = server {
        match handle.await {
            Ok(Ok(())) => info!("Status server stopped"),
            Ok(Err(e)) => warn!(error = %e, "Status server error"),
            Err(e) => warn!(error = %e, "Status server task failed"),
        }
    }

    Ok(())
}

fn open_store(config: &Config) -> Result<(Arc<dyn PackStore>, Arc<dyn CursorStore>)> {
    match config.store.backend {
        StoreBackend::Local => {
            let local = &config.store.local;
            info!(root = ?local.root, database = ?local.database, "Opening local store");
            let store = Arc::new(
                LocalStore::new(&local.root, &local.database)
                    .context("Failed to open local store")?,
            );
            let packs: Arc<dyn PackStore> = store.clone();
            let cursor: Arc<dyn CursorStore> = store;
            Ok((packs, cursor))
        }
        StoreBackend::Supabase => {
            let supabase = config
                .store
                .supabase
                .clone()
                .context("store.supabase section is required for the supabase backend")?;
            info!(url = %supabase.url, bucket = %supabase.bucket, "Connecting to Supabase");
            let store =
                Arc::new(SupabaseStore::new(supabase).context("Failed to create Supabase store")?);
            let packs: Arc<dyn PackStore> = store.clone();
            let cursor: Arc<dyn CursorStore> = store;
            Ok((packs, cursor))
        }
    }
}
