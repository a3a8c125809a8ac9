use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::api::qbittorrent::QbitClient;
use crate::core::config::Config;
use crate::notify::discord::DiscordWebhook;
use crate::scheduler::{Scheduler, SchedulerSettings};

pub type DigestScheduler = Scheduler<QbitClient, DiscordWebhook>;

/// Construct the gateway, notifier and scheduler from validated configuration.
/// Any failure here is fatal.
pub fn build_scheduler(config: &Config) -> Result<DigestScheduler> {
    let gateway = QbitClient::new(
        &config.client.url,
        config.client.username.clone(),
        config.client.password.clone(),
        config.request_timeout(),
    )
    .context("Failed to create torrent client gateway")?;

    let notifier = DiscordWebhook::new(
        config.notifier.webhook_url.clone(),
        config.notifier.username.clone(),
        config.request_timeout(),
    )
    .context("Failed to create Discord notifier")?;

    Ok(Scheduler::new(gateway, notifier, SchedulerSettings::from(config)))
}

/// Cancel `shutdown` on Ctrl+C or SIGTERM
pub fn spawn_signal_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.cancel();
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutdown signal received, finishing current cycle");
}
