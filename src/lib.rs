//! Cluster identity and shared configuration store for the HAProxy data plane
//! control service.

pub mod config;
pub mod observability;

pub use config::ConfigStore;
pub use config::ClusterIdentity;
pub use config::ConfigError;
