//! Shared helpers for integration tests.

use dataplane_config::config::ConfigStore;

/// Give every identity field a distinctive value.
#[allow(dead_code)]
pub fn fill_identity(store: &ConfigStore) {
    let c = &store.cluster;
    c.id.store("7f3c".into());
    c.mode.store("cluster".into());
    c.bootstrap_key.store("bootstrap-key".into());
    c.active_bootstrap_key.store("active-key".into());
    c.token.store("token-value".into());
    c.url.store("https://fusion.example.com".into());
    c.port.store("8443".into());
    c.api_base_path.store("/v2".into());
    c.certificate_path.store("/etc/haproxy/ssl/node.crt".into());
    c.certificate_key_path.store("/etc/haproxy/ssl/node.key".into());
    c.cert_fetched.store(true);
    c.name.store("edge-node-1".into());
    c.status.store("active".into());
    c.description.store("edge node: eu-west".into());
}
