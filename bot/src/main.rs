use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use bot::{config::AppConfig, startup::announce_startup};
use common::logger::init_logger;
use market::{feed::ws::DerivWsClient, ingester::StreamIngester, registry::TickRegistry};
use notifier::TelegramNotifier;
use scheduler::{CycleDriver, NotificationSequencer};

/// Starts the feed plus ingester. The task ends when the feed gives up or
/// `cancel` fires.
fn start_ingestion(
    registry: Arc<TickRegistry>,
    cfg: &AppConfig,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let feed = Arc::new(DerivWsClient::new(cfg.feed_ws_url.clone()));
    let ingester = StreamIngester::new(feed, registry);

    tokio::spawn(async move {
        match ingester.run(cancel).await {
            Ok(stats) => info!(ticks = stats.ticks, "tick ingestion stopped"),
            Err(e) => error!(error = ?e, "tick ingestion failed"),
        }
    })
}

/// Starts the selection/notification loop on its own task.
fn start_cycle_driver(
    registry: Arc<TickRegistry>,
    notifier: Arc<TelegramNotifier>,
    cfg: &AppConfig,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let sequencer = NotificationSequencer::new(notifier, cfg.sequencer_config());
    let driver = CycleDriver::new(registry, cfg.selector, sequencer);

    tokio::spawn(driver.run(cancel))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // a missing .env is fine
    let _ = dotenvy::dotenv();

    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_logger("signal-bot", is_production);

    info!("Starting signal bot...");

    let cfg = AppConfig::from_env().inspect_err(|e| error!(error = %e, "invalid configuration"))?;
    info!(
        instruments = cfg.instruments.len(),
        mode = %cfg.mode,
        strategy = %cfg.strategy_name,
        tz = %cfg.display_tz,
        "configuration loaded"
    );

    let cancel = CancellationToken::new();
    let registry = Arc::new(TickRegistry::new(
        cfg.instruments.iter().cloned(),
        cfg.buffer_capacity,
    ));
    let notifier = Arc::new(TelegramNotifier::new(
        &cfg.telegram_api_url,
        &cfg.telegram_token,
    )?);

    let ingestion = start_ingestion(Arc::clone(&registry), &cfg, cancel.clone());

    announce_startup(notifier.as_ref(), &cfg).await;

    let cycles = start_cycle_driver(registry, notifier, &cfg, cancel.clone());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    cancel.cancel();
    for (name, handle) in [("cycle driver", cycles), ("ingestion", ingestion)] {
        if let Err(e) = handle.await {
            error!(task = name, error = %e, "task panicked during shutdown");
        }
    }

    info!("Signal bot stopped");
    Ok(())
}
