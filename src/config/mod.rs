//! Configuration and cluster-identity subsystem.
//!
//! # Data Flow
//! ```text
//! CLI flags (options.rs)
//!     → ConfigStore::install_options
//!
//! API schema + bound host/port
//!     → ConfigStore::load
//!         → loader.rs (basePath, snapshot file YAML/TOML)
//!         → cluster.rs (wholesale replace, apply defaults)
//!
//! Runtime mutation (e.g. bootstrap key rotation)
//!     → atomic.rs field store
//!     → loader.rs write snapshot
//!     → notify.rs signal → listeners holding a Watch
//! ```
//!
//! # Design Decisions
//! - Each identity field is its own lock-free cell; no global lock
//! - Only the cluster identity is persisted; options and server info are not
//! - A corrupt snapshot is fatal rather than silently replaced by defaults
//! - Restart signals coalesce; key-change signals apply backpressure with a timeout

pub mod atomic;
pub mod cluster;
pub mod loader;
pub mod notify;
pub mod options;
pub mod store;

pub use atomic::{AtomicField, AtomicFlag, AtomicString};
pub use cluster::{ClusterIdentity, ClusterSnapshot};
pub use loader::ConfigError;
pub use notify::{NotificationChannel, NotifyError, OverflowPolicy, SendOutcome, Watch};
pub use options::{HaproxyOptions, LoggingOptions, ServerRuntimeInfo};
pub use store::ConfigStore;
