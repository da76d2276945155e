use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::RwLock;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use placelink::{
    cache::{shutdown_channel, CacheMaintenance, CacheStore, FileSlot, StorageSlot},
    config::Config,
    lookup::{HttpPlaceSource, LookupCoordinator},
};

#[derive(Parser)]
#[command(name = "placelink")]
#[command(version = "0.1.0")]
#[command(about = "Place lookup cache with LZ-compressed persistence")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Place ids to resolve; with none given, runs as a daemon until Ctrl-C
    ids: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with specified level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("placelink={}", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting placelink v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration from specified file
    std::env::set_var("CONFIG_FILE", &cli.config);
    let config = Config::load()?;
    info!("Configuration loaded from: {}", cli.config);

    // Restore the persisted cache; corruption falls back to a cold cache.
    let slot: Arc<dyn StorageSlot> = Arc::new(FileSlot::new(&config.cache.slot_path));
    let cache = Arc::new(RwLock::new(CacheStore::load_from(slot.as_ref())));
    info!(
        "Cache restored with {} records from {}",
        cache.read().await.len(),
        config.cache.slot_path.display()
    );

    let source = Arc::new(HttpPlaceSource::new(&config.lookup)?);
    let coordinator = LookupCoordinator::new(Arc::clone(&cache), source, config.cache.ttl());

    // Start the background sweep-and-flush cycle.
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let maintenance = CacheMaintenance::new(
        Arc::clone(&cache),
        Arc::clone(&slot),
        config.cache.ttl(),
        config.cache.sweep_interval(),
        shutdown_rx,
    );
    let maintenance_handle = tokio::spawn(maintenance.run());

    if cli.ids.is_empty() {
        info!("No place ids given, running until Ctrl-C");
        tokio::signal::ctrl_c().await?;
    } else {
        for id in &cli.ids {
            match coordinator.resolve(id).await {
                Ok(record) if record.not_found => {
                    info!("{}: no matching place", id);
                }
                Ok(record) => {
                    let loc = record
                        .loc
                        .map(|loc| format!("{}, {}", loc.lat, loc.lng))
                        .unwrap_or_else(|| "unknown location".to_string());
                    info!(
                        "{}: {}{}",
                        id,
                        loc,
                        if record.closed { " (permanently closed)" } else { "" }
                    );
                }
                Err(e) => error!("{}: lookup failed: {}", id, e),
            }
        }
    }

    // Final flush happens inside the maintenance shutdown path.
    let _ = shutdown_tx.send(());
    maintenance_handle.await?;
    info!("Cache flushed, exiting");

    Ok(())
}
