mod actors;
mod server;
mod shutdown;
mod window;

use std::sync::Arc;

use actors::{
    DeliveryHandle, NotifierActor, TrackerActor, TrackerDependencies, TrackerSettings,
};
use anyhow::{Context, Result};
use server::Server;
use shutdown::ShutdownSignals;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vigil_adapters::{DesktopEntryCatalog, SqliteHeartbeatStore, SqliteReportOutbox, TelegramSink};
use vigil_core::{
    CachedPackageClassifier, Config, DeliveryPipeline, InterruptionDetector,
    SecretsCredentialSource, SystemClock,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vigil_daemon=debug".parse()?))
        .init();

    info!("vigil daemon starting");

    let config = Config::load().unwrap_or_else(|error| {
        warn!(%error, "failed to load config, using defaults");
        Config::default()
    });

    let (shutdown_sender, shutdown_receiver) = broadcast::channel::<()>(1);
    let mut signals = ShutdownSignals::install().context("failed to install signal handlers")?;

    tokio::spawn(async move {
        let signal = signals.recv().await;
        info!(signal, "shutdown signal received, initiating shutdown");
        shutdown_sender.send(()).ok();
    });

    let (notifier_actor, notifier_handle) = NotifierActor::new(config.alarms.enabled);
    tokio::spawn(notifier_actor.run());

    let reports_path = config.reports_database_path();
    let outbox = Arc::new(
        SqliteReportOutbox::new(&reports_path)
            .with_context(|| format!("failed to open outbox at {}", reports_path.display()))?,
    );
    let heartbeat_path = config.heartbeat_database_path();
    let heartbeat_store = Arc::new(
        SqliteHeartbeatStore::new(&heartbeat_path).with_context(|| {
            format!("failed to open heartbeat store at {}", heartbeat_path.display())
        })?,
    );
    info!(?reports_path, ?heartbeat_path, "storage ready");

    let pipeline = Arc::new(DeliveryPipeline::new(
        outbox.clone(),
        Arc::new(TelegramSink::from_config(&config.delivery)),
        Arc::new(SecretsCredentialSource),
    ));
    let delivery = DeliveryHandle::new(pipeline);

    let clock = Arc::new(SystemClock);
    let classifier = Arc::new(CachedPackageClassifier::new(
        Arc::new(DesktopEntryCatalog::from_config(&config.classifier)),
        clock.clone(),
        config.tracking.self_package.clone(),
        (config.classifier.cache_ttl_seconds * 1000) as i64,
    ));

    let settings = TrackerSettings::from_config(&config.tracking, config.heartbeat.interval_seconds);
    let (tracker_actor, tracker_handle) = TrackerActor::new(
        TrackerDependencies {
            source: window::create_event_source(settings.lookback_window_ms),
            classifier,
            outbox: outbox.clone(),
            detector: InterruptionDetector::new(
                heartbeat_store,
                outbox,
                config.heartbeat.interruption_threshold_ms(),
            ),
            clock,
            delivery: delivery.clone(),
            notifier: Some(notifier_handle),
        },
        settings,
        config.tracking.min_session_millis,
    );
    tokio::spawn(tracker_actor.run());

    let server = Server::new(tracker_handle.clone(), delivery);
    server.run(shutdown_receiver).await?;

    // Close the open session so it is not lost with the process.
    tracker_handle.stop().await;

    info!("vigil daemon stopped");
    std::process::exit(0);
}
