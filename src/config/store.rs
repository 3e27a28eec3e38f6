//! Process-wide configuration store.
//!
//! # Lifecycle
//! ```text
//! Uninitialized ──first ConfigStore::global()──▶ Ready (lives until exit)
//! ```
//!
//! # Data Flow
//! ```text
//! startup:  install_options(haproxy, logging)
//!           load(schema, host, port) → server info + cluster identity
//! runtime:  bootstrap_key_changed(k) → store field → save → key-changed signal
//!           restart_server()         → restart signal
//! listeners: watch_bootstrap_key_change() / watch_restart()
//! ```

use arc_swap::ArcSwap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use crate::config::cluster::ClusterIdentity;
use crate::config::loader::{self, ConfigError, Snapshot};
use crate::config::notify::{NotificationChannel, NotifyError, OverflowPolicy, SendOutcome, Watch};
use crate::config::options::{HaproxyOptions, LoggingOptions, ServerRuntimeInfo};
use crate::observability::metrics;

/// How long a key-change send waits for the previous signal to be consumed.
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

static GLOBAL: OnceLock<ConfigStore> = OnceLock::new();

/// Shared configuration and cluster identity.
///
/// All accessors take `&self`; the store is `Sync` and meant to be shared as
/// `&'static ConfigStore` (see [`ConfigStore::global`]) or behind an `Arc`.
#[derive(Debug)]
pub struct ConfigStore {
    haproxy: ArcSwap<HaproxyOptions>,
    logging: ArcSwap<LoggingOptions>,
    server: ArcSwap<ServerRuntimeInfo>,

    /// Cluster identity; fields are read and written directly.
    pub cluster: ClusterIdentity,

    key_changed: NotificationChannel,
    restart: NotificationChannel,

    /// Serializes snapshot writes so the last rename carries the latest state.
    save_lock: Mutex<()>,
}

impl ConfigStore {
    /// Create an isolated store with default options.
    pub fn new() -> Self {
        Self::with_notify_timeout(DEFAULT_NOTIFY_TIMEOUT)
    }

    /// Create an isolated store whose key-change sends wait at most `timeout`.
    pub fn with_notify_timeout(timeout: Duration) -> Self {
        Self {
            haproxy: ArcSwap::from_pointee(HaproxyOptions::default()),
            logging: ArcSwap::from_pointee(LoggingOptions::default()),
            server: ArcSwap::from_pointee(ServerRuntimeInfo::default()),
            cluster: ClusterIdentity::default(),
            key_changed: NotificationChannel::new(
                "bootstrap_key",
                OverflowPolicy::Block { timeout },
            ),
            restart: NotificationChannel::new("restart", OverflowPolicy::Coalesce),
            save_lock: Mutex::new(()),
        }
    }

    /// The process-wide store, created on first access.
    ///
    /// Concurrent first calls all observe the same instance.
    pub fn global() -> &'static ConfigStore {
        GLOBAL.get_or_init(|| {
            tracing::debug!("Initializing global configuration store");
            ConfigStore::new()
        })
    }

    /// Like [`ConfigStore::global`], but a store created by this call uses
    /// `notify_timeout` for key-change sends. Has no effect on the timeout
    /// if the global store already exists.
    pub fn init_global(notify_timeout: Duration) -> &'static ConfigStore {
        GLOBAL.get_or_init(|| ConfigStore::with_notify_timeout(notify_timeout))
    }

    /// Install startup options.
    pub fn install_options(&self, haproxy: HaproxyOptions, logging: LoggingOptions) {
        self.haproxy.store(Arc::new(haproxy));
        self.logging.store(Arc::new(logging));
    }

    pub fn haproxy(&self) -> Arc<HaproxyOptions> {
        self.haproxy.load_full()
    }

    pub fn logging(&self) -> Arc<LoggingOptions> {
        self.logging.load_full()
    }

    pub fn server(&self) -> Arc<ServerRuntimeInfo> {
        self.server.load_full()
    }

    /// Derive server info and bootstrap the cluster identity.
    ///
    /// Blocks on file I/O. A [`ConfigError::Schema`] leaves the store
    /// untouched; a [`ConfigError::CorruptSnapshot`] is fatal and the caller
    /// must not continue with the current identity.
    pub fn load(&self, schema: &[u8], host: &str, port: u16) -> Result<(), ConfigError> {
        let api_base_path = loader::parse_base_path(schema)?;

        let host = if host == "localhost" { "127.0.0.1" } else { host };
        self.server.store(Arc::new(ServerRuntimeInfo {
            host: host.to_string(),
            port,
            api_base_path,
        }));

        let loaded = match self.haproxy().snapshot_path() {
            Some(path) => match loader::read_snapshot(path)? {
                Snapshot::Loaded(cluster) => {
                    tracing::info!(path = %path.display(), "Cluster snapshot loaded");
                    metrics::record_load("file");
                    cluster
                }
                Snapshot::Empty => {
                    tracing::info!(path = %path.display(), "Cluster snapshot is empty, using defaults");
                    metrics::record_load("empty");
                    ClusterIdentity::default()
                }
                Snapshot::Missing => {
                    metrics::record_load("default");
                    ClusterIdentity::default()
                }
            },
            None => {
                metrics::record_load("ephemeral");
                ClusterIdentity::default()
            }
        };

        self.cluster.replace_with(&loaded);
        self.cluster.apply_defaults();

        tracing::info!(
            name = %self.cluster.name.load(),
            mode = %self.cluster.mode.load(),
            host = %host,
            port = port,
            "Configuration loaded"
        );
        Ok(())
    }

    /// Persist the cluster identity to the configured snapshot path.
    ///
    /// No-op when persistence is not configured.
    pub fn save(&self) -> Result<(), ConfigError> {
        let haproxy = self.haproxy();
        let Some(path) = haproxy.snapshot_path() else {
            return Ok(());
        };

        let _guard = self.save_lock.lock().unwrap_or_else(|e| e.into_inner());
        let result = loader::write_snapshot(path, &self.cluster);
        match &result {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Cluster snapshot saved");
                metrics::record_save("ok");
            }
            Err(_) => metrics::record_save("error"),
        }
        result
    }

    /// Rotate the bootstrap key, persist it and wake key-change listeners.
    ///
    /// A failed save is logged, not returned: the in-memory key is already
    /// authoritative for this process.
    pub fn bootstrap_key_changed(&self, bootstrap_key: impl Into<String>) -> Result<(), NotifyError> {
        self.cluster.bootstrap_key.store(bootstrap_key.into());
        if let Err(e) = self.save() {
            tracing::error!(error = %e, fatal = e.is_fatal(), "Failed to persist bootstrap key");
        }
        self.key_changed.notify().map(|_| ())
    }

    /// Wake key-change listeners without changing the key.
    pub fn bootstrap_key_reload(&self) -> Result<(), NotifyError> {
        self.key_changed.notify().map(|_| ())
    }

    /// Ask the server to restart. Coalesces with a pending request.
    pub fn restart_server(&self) -> SendOutcome {
        match self.restart.notify() {
            Ok(outcome) => outcome,
            // A coalescing channel never rejects a send.
            Err(_) => SendOutcome::Coalesced,
        }
    }

    pub fn watch_bootstrap_key_change(&self) -> Watch {
        self.key_changed.watch()
    }

    pub fn watch_restart(&self) -> Watch {
        self.restart.watch()
    }

    /// Sending side of the key-change channel, for non-blocking sends.
    pub fn key_change_channel(&self) -> &NotificationChannel {
        &self.key_changed
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}
