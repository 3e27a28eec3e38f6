//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! config store, notification channels, binary:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters via the metrics facade)
//!
//! Consumers:
//!     → stdout or log file
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields, not formatted strings
//! - Metrics are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
