use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;

use torrent_digest::core::config::Config;
use torrent_digest::core::startup::{build_scheduler, spawn_signal_listener};
use torrent_digest::core::tracing_init::init_tracing;

fn main() -> Result<()> {
    let config_path = env::args().nth(1).map(PathBuf::from);

    // Load and validate configuration
    let config = Config::load(config_path.as_deref()).context(
        "Failed to load configuration. Set QBITTORRENT_URL and DISCORD_WEBHOOK_URL \
        or pass the path to a config.toml file.",
    )?;

    init_tracing(&config.logging);

    // One cycle is ever in flight, a single worker thread is enough
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: Config) -> Result<()> {
    info!(
        client_url = %config.client.url,
        interval_secs = config.schedule.interval_secs,
        request_timeout_secs = config.request_timeout().as_secs(),
        max_backoff_secs = config.max_backoff().as_secs(),
        log_level = %config.logging.level,
        log_format = %config.logging.format,
        "Torrent digest starting"
    );

    let scheduler = build_scheduler(&config)?;

    let shutdown = CancellationToken::new();
    spawn_signal_listener(shutdown.clone());

    scheduler.run(shutdown).await;

    info!("Shutting down gracefully");

    Ok(())
}
