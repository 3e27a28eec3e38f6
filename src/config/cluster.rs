//! Cluster identity of this node.
//!
//! # Responsibilities
//! - Hold the node's cluster-membership facts as independent atomic fields
//! - Fill in documented defaults for fields left empty
//! - Serialize/deserialize as one unit (the persisted snapshot)

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::atomic::{AtomicFlag, AtomicString};

/// Mode used when none is configured.
pub const DEFAULT_MODE: &str = "single";

/// Certificate path used when none is configured.
pub const DEFAULT_CERTIFICATE_PATH: &str = "tls.crt";

/// Certificate key path used when none is configured.
pub const DEFAULT_CERTIFICATE_KEY_PATH: &str = "tls.key";

/// Cluster-membership facts for this node.
///
/// Every field can be read and replaced independently from any thread.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ClusterIdentity {
    pub id: AtomicString,
    pub mode: AtomicString,
    pub bootstrap_key: AtomicString,
    pub active_bootstrap_key: AtomicString,
    pub token: AtomicString,
    pub url: AtomicString,
    pub port: AtomicString,
    pub api_base_path: AtomicString,
    #[serde(rename = "tls-certificate")]
    pub certificate_path: AtomicString,
    #[serde(rename = "tls-key")]
    pub certificate_key_path: AtomicString,
    pub cert_fetched: AtomicFlag,
    pub name: AtomicString,
    pub status: AtomicString,
    pub description: AtomicString,
}

/// Plain point-in-time copy of a [`ClusterIdentity`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterSnapshot {
    pub id: String,
    pub mode: String,
    pub bootstrap_key: String,
    pub active_bootstrap_key: String,
    pub token: String,
    pub url: String,
    pub port: String,
    pub api_base_path: String,
    pub certificate_path: String,
    pub certificate_key_path: String,
    pub cert_fetched: bool,
    pub name: String,
    pub status: String,
    pub description: String,
}

impl ClusterIdentity {
    /// Fill empty mode, certificate paths and name with their defaults.
    ///
    /// Idempotent: a second call without intervening writes changes nothing.
    pub fn apply_defaults(&self) {
        if self.mode.store_if_empty(DEFAULT_MODE) {
            tracing::debug!(mode = DEFAULT_MODE, "Cluster mode defaulted");
        }
        self.certificate_path.store_if_empty(DEFAULT_CERTIFICATE_PATH);
        self.certificate_key_path.store_if_empty(DEFAULT_CERTIFICATE_KEY_PATH);

        if self.name.is_empty() && self.name.store_if_empty(generate_node_name()) {
            tracing::info!(name = %self.name.load(), "Generated cluster node name");
        }
    }

    /// Overwrite every field with the corresponding value from `other`.
    pub fn replace_with(&self, other: &ClusterIdentity) {
        self.id.store(other.id.load());
        self.mode.store(other.mode.load());
        self.bootstrap_key.store(other.bootstrap_key.load());
        self.active_bootstrap_key.store(other.active_bootstrap_key.load());
        self.token.store(other.token.load());
        self.url.store(other.url.load());
        self.port.store(other.port.load());
        self.api_base_path.store(other.api_base_path.load());
        self.certificate_path.store(other.certificate_path.load());
        self.certificate_key_path.store(other.certificate_key_path.load());
        self.cert_fetched.store(other.cert_fetched.load());
        self.name.store(other.name.load());
        self.status.store(other.status.load());
        self.description.store(other.description.load());
    }

    /// Copy the current field values.
    pub fn snapshot(&self) -> ClusterSnapshot {
        ClusterSnapshot {
            id: self.id.load(),
            mode: self.mode.load(),
            bootstrap_key: self.bootstrap_key.load(),
            active_bootstrap_key: self.active_bootstrap_key.load(),
            token: self.token.load(),
            url: self.url.load(),
            port: self.port.load(),
            api_base_path: self.api_base_path.load(),
            certificate_path: self.certificate_path.load(),
            certificate_key_path: self.certificate_key_path.load(),
            cert_fetched: self.cert_fetched.load(),
            name: self.name.load(),
            status: self.status.load(),
            description: self.description.load(),
        }
    }
}

impl From<ClusterSnapshot> for ClusterIdentity {
    fn from(s: ClusterSnapshot) -> Self {
        Self {
            id: s.id.into(),
            mode: s.mode.into(),
            bootstrap_key: s.bootstrap_key.into(),
            active_bootstrap_key: s.active_bootstrap_key.into(),
            token: s.token.into(),
            url: s.url.into(),
            port: s.port.into(),
            api_base_path: s.api_base_path.into(),
            certificate_path: s.certificate_path.into(),
            certificate_key_path: s.certificate_key_path.into(),
            cert_fetched: s.cert_fetched.into(),
            name: s.name.into(),
            status: s.status.into(),
            description: s.description.into(),
        }
    }
}

/// Mint a new node name.
///
/// UUIDv7: 48-bit millisecond timestamp followed by a counter and random bits
/// from the OS CSPRNG. Names minted in one process are strictly increasing,
/// and the 36-character hyphenated form sorts by creation time.
pub fn generate_node_name() -> String {
    Uuid::now_v7().hyphenated().to_string()
}
