//! Data plane configuration daemon.
//!
//! Bootstraps this node's cluster identity and keeps it persisted, then waits
//! for change notifications:
//!
//! ```text
//! CLI → logging/metrics → ConfigStore::load → save
//!     ├─ key-change watch  → log rotation
//!     ├─ restart watch     → exit for supervisor restart
//!     ├─ SIGHUP            → bootstrap_key_reload
//!     └─ Ctrl-C            → exit
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use dataplane_config::config::{ConfigStore, HaproxyOptions, LoggingOptions};
use dataplane_config::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "dataplane-config")]
#[command(about = "Cluster identity store for the HAProxy data plane service", long_about = None)]
struct Cli {
    #[command(flatten)]
    haproxy: HaproxyOptions,

    #[command(flatten)]
    logging: LoggingOptions,

    /// Path to the API schema document (JSON, must contain basePath)
    #[arg(long = "api-schema")]
    api_schema: PathBuf,

    /// Host the API is bound to
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Port the API is bound to
    #[arg(long, default_value_t = 5555)]
    port: u16,

    /// Seconds a bootstrap key notification waits for the previous one to be consumed
    #[arg(long = "notify-timeout", default_value_t = 5)]
    notify_timeout: u64,

    /// Bind address for the Prometheus metrics endpoint
    #[arg(long = "metrics-address")]
    metrics_address: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    logging::init_logging(&cli.logging)?;
    tracing::info!("dataplane-config v{} starting", env!("CARGO_PKG_VERSION"));

    if let Some(addr) = cli.metrics_address {
        if let Err(e) = metrics::init_metrics(addr) {
            tracing::error!(metrics_address = %addr, error = %e, "Failed to start metrics exporter");
        }
    }

    let store = ConfigStore::init_global(Duration::from_secs(cli.notify_timeout));
    store.install_options(cli.haproxy, cli.logging);

    let schema = tokio::fs::read(&cli.api_schema).await?;
    let (host, port) = (cli.host, cli.port);
    let loaded = tokio::task::spawn_blocking(move || store.load(&schema, &host, port)).await?;
    if let Err(e) = loaded {
        if e.is_fatal() {
            tracing::error!(error = %e, "Cannot continue with an ambiguous cluster identity");
            std::process::exit(1);
        }
        return Err(e.into());
    }

    // Persist generated defaults so the node name survives restarts.
    if let Err(e) = tokio::task::spawn_blocking(move || store.save()).await? {
        if e.is_fatal() {
            tracing::error!(error = %e, "Cluster snapshot encoding failed");
            std::process::exit(1);
        }
        tracing::warn!(error = %e, "Could not persist cluster snapshot");
    }

    let key_watch = store.watch_bootstrap_key_change();
    tokio::spawn(async move {
        loop {
            key_watch.recv().await;
            tracing::info!(
                name = %store.cluster.name.load(),
                key_set = !store.cluster.bootstrap_key.is_empty(),
                "Bootstrap key changed"
            );
        }
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        let mut hup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to register SIGHUP handler");
                return;
            }
        };
        while hup.recv().await.is_some() {
            tracing::info!("SIGHUP received, reloading bootstrap key");
            match tokio::task::spawn_blocking(move || store.bootstrap_key_reload()).await {
                Ok(Err(e)) => tracing::warn!(error = %e, "Bootstrap key reload not delivered"),
                Err(e) => tracing::error!(error = %e, "Bootstrap key reload task failed"),
                Ok(Ok(())) => {}
            }
        }
    });

    let restart_watch = store.watch_restart();
    tokio::select! {
        _ = restart_watch.recv() => {
            tracing::warn!("Restart requested, exiting");
        }
        res = tokio::signal::ctrl_c() => {
            res?;
            tracing::info!("Shutdown signal received");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
