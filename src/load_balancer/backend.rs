//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server by its `host:port` identity
//! - Count dispatched requests (mutated on every successful dispatch)
//! - Carry a health flag (reported, not used for routing)
//! - Hold the ordered registry of every backend ever registered

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::BackendConfig;

/// A single backend server.
#[derive(Debug)]
pub struct Backend {
    /// Hostname or IP literal.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Health flag. Nothing health-checks backends, so this stays `true`.
    healthy: AtomicBool,
    /// Number of connections dispatched to this backend.
    requests: AtomicU64,
}

impl Backend {
    /// Create a new backend.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            healthy: AtomicBool::new(true),
            requests: AtomicU64::new(0),
        }
    }

    /// Canonical `host:port` key, used as hash input and dial address.
    pub fn key(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether this backend has the same `(host, port)` identity.
    pub fn same_identity(&self, host: &str, port: u16) -> bool {
        self.host == host && self.port == port
    }

    /// Number of connections dispatched so far.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Record one dispatched connection.
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Reported by `backend/list`; routing ignores it.
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl From<&BackendConfig> for Backend {
    fn from(config: &BackendConfig) -> Self {
        Backend::new(config.host.clone(), config.port)
    }
}

/// Ordered collection of registered backends.
///
/// Append-only: there is no duplicate check and no removal.
#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    backends: Vec<Arc<Backend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from backend configuration, preserving order.
    pub fn from_config(configs: &[BackendConfig]) -> Self {
        Self {
            backends: configs.iter().map(|c| Arc::new(Backend::from(c))).collect(),
        }
    }

    /// Append a backend.
    pub fn add(&mut self, backend: Arc<Backend>) {
        self.backends.push(backend);
    }

    pub fn as_slice(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Backend>> {
        self.backends.iter()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Look up a backend by identity.
    pub fn find(&self, host: &str, port: u16) -> Option<Arc<Backend>> {
        self.backends
            .iter()
            .find(|b| b.same_identity(host, port))
            .cloned()
    }
}

impl From<Vec<Arc<Backend>>> for BackendRegistry {
    fn from(backends: Vec<Arc<Backend>>) -> Self {
        Self { backends }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_key() {
        let b = Backend::new("localhost", 8081);
        assert_eq!(b.key(), "localhost:8081");
        assert_eq!(b.to_string(), "localhost:8081");
    }

    #[test]
    fn test_request_counter() {
        let b = Backend::new("127.0.0.1", 9000);
        assert_eq!(b.request_count(), 0);
        b.record_request();
        b.record_request();
        assert_eq!(b.request_count(), 2);
    }

    #[test]
    fn test_registry_appends_without_dedup() {
        let mut registry = BackendRegistry::new();
        registry.add(Arc::new(Backend::new("localhost", 8081)));
        registry.add(Arc::new(Backend::new("localhost", 8081)));
        registry.add(Arc::new(Backend::new("localhost", 8082)));

        assert_eq!(registry.len(), 3);
        let keys: Vec<String> = registry.iter().map(|b| b.key()).collect();
        assert_eq!(keys, ["localhost:8081", "localhost:8081", "localhost:8082"]);
        assert!(registry.find("localhost", 8082).is_some());
        assert!(registry.find("localhost", 8083).is_none());
    }
}
