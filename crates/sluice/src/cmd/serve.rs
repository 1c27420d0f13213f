//! Serve command - Run the configured UDP listeners
//!
//! Builds the event-loop pool, launches one listener per enabled
//! `[[listeners]]` entry and runs until SIGINT or SIGTERM. Listeners hand
//! messages to a bounded queue; a drain task logs them off the read path.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use sluice_config::Config;
use sluice_metrics::{ListenerMetricsProvider, MetricsReporter};
use sluice_pipeline::{ChannelConsumer, ListenerIdentity, MessageConsumer, RawMessage};
use sluice_transport::{EventLoopHandle, EventLoopPool, ListenerConfig, UdpListener};

/// Config files tried when `--config` is not given
const DEFAULT_CONFIG_PATHS: [&str; 2] = ["configs/sluice.toml", "sluice.toml"];

/// Messages queued between the readers and the drain task
const MESSAGE_QUEUE_CAPACITY: usize = 10_000;

/// Serve command arguments
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Path to configuration file (defaults to configs/sluice.toml if not specified)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Load configuration from `path`, or from the first default path that exists
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        // User explicitly provided config path - must exist
        if !path.exists() {
            anyhow::bail!("config file not found: {}", path.display());
        }
        return Config::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()));
    }

    for candidate in DEFAULT_CONFIG_PATHS {
        let candidate = Path::new(candidate);
        if candidate.exists() {
            return Config::from_file(candidate).with_context(|| {
                format!("failed to load configuration from {}", candidate.display())
            });
        }
    }

    Ok(Config::default())
}

/// Run the serve command
///
/// Blocks until a shutdown signal arrives and the pool has stopped.
pub fn run(config: Config, config_path: Option<&Path>) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        platform = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        config = %config_path.map(|p| p.display().to_string()).unwrap_or_else(|| "(default)".into()),
        "Sluice starting"
    );

    config
        .require_listeners()
        .context("nothing to serve, add a [[listeners]] entry")?;

    let pool = EventLoopPool::new(&config.event_loop).context("failed to start event loop pool")?;
    let shutdown_timeout = Duration::from_secs(config.event_loop.shutdown_timeout_secs);

    let result = pool.block_on(run_server(&config, pool.handle()));
    if let Err(e) = &result {
        error!(error = %e, "server error");
    }

    pool.shutdown(shutdown_timeout);
    info!("Sluice shutdown complete");
    result
}

/// Main server run loop
async fn run_server(config: &Config, event_loop: EventLoopHandle) -> Result<()> {
    let cancel = CancellationToken::new();
    let (queue, receiver) = ChannelConsumer::new(MESSAGE_QUEUE_CAPACITY);
    let queue = Arc::new(queue);
    let consumer: Arc<dyn MessageConsumer> = queue.clone();

    let drain_task = event_loop.spawn(drain_messages(receiver, cancel.clone()));
    let listeners = launch_listeners(config, &event_loop, &consumer)?;

    let metrics_task = if config.metrics.enabled {
        let providers = listeners
            .iter()
            .map(|l| Arc::new(l.metrics_handle()) as Arc<dyn ListenerMetricsProvider>)
            .collect();
        let reporter = MetricsReporter::builder()
            .config(config.metrics.clone())
            .listeners(providers)
            .build();
        let cancel = cancel.clone();
        Some(event_loop.spawn(async move { reporter.run(cancel).await }))
    } else {
        info!("metrics reporting disabled");
        None
    };

    info!(
        listener_count = listeners.len(),
        worker_threads = event_loop.worker_threads(),
        metrics_enabled = config.metrics.enabled,
        "Sluice running"
    );

    wait_for_shutdown().await?;
    info!("shutdown signal received, stopping listeners...");

    for listener in &listeners {
        listener.stop();
    }
    cancel.cancel();

    let timeout = Duration::from_secs(config.event_loop.shutdown_timeout_secs);
    if let Some(task) = metrics_task {
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "metrics reporter panicked"),
            Err(_) => warn!("metrics reporter did not finish within timeout"),
        }
    }
    if tokio::time::timeout(timeout, drain_task).await.is_err() {
        warn!("message drain did not finish within timeout");
    }

    info!(
        queued = queue.sent(),
        dropped = queue.dropped(),
        "message queue closed"
    );

    Ok(())
}

/// Log queued messages until cancelled or every sender is gone
async fn drain_messages(mut receiver: mpsc::Receiver<RawMessage>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            message = receiver.recv() => match message {
                Some(message) => log_message(message),
                None => break,
            },
        }
    }
}

/// Construct and launch every enabled listener
///
/// Listeners launched before a failure are stopped when the vector drops.
fn launch_listeners(
    config: &Config,
    event_loop: &EventLoopHandle,
    consumer: &Arc<dyn MessageConsumer>,
) -> Result<Vec<UdpListener>> {
    let mut listeners = Vec::new();

    for entry in config.enabled_listeners() {
        let listener = UdpListener::new(
            ListenerConfig::from(entry),
            event_loop.clone(),
            Arc::clone(consumer),
        )
        .with_context(|| format!("invalid listener '{}'", entry.id))?;

        listener
            .launch(ListenerIdentity::new(entry.id.as_str(), entry.display_name()))
            .with_context(|| format!("failed to launch listener '{}'", entry.id))?;

        listeners.push(listener);
    }

    Ok(listeners)
}

/// Log one received message
fn log_message(message: RawMessage) {
    debug!(
        listener_id = %message.listener_id,
        message_id = %message.id,
        remote = %message.remote,
        bytes = message.payload.len(),
        received_at = %message.received_at,
        "message received"
    );
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("failed to install SIGTERM handler")?;

        tokio::select! {
            result = signal::ctrl_c() => result.context("failed to listen for Ctrl+C")?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;

    Ok(())
}

#[cfg(test)]
#[path = "serve_test.rs"]
mod serve_test;
