//! Proxied session tracking.
//!
//! # Responsibilities
//! - Count live proxied sessions
//! - Tie a session's lifetime to its relay tasks
//! - Release the listener permit when the session ends

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::net::listener::ConnectionPermit;

/// Tracks active proxied sessions.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    /// Current count of active sessions.
    active_count: Arc<AtomicU64>,
    /// Sessions ever started.
    total_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new session. The count drops when the guard is dropped.
    pub fn track(&self, request_id: String, permit: Option<ConnectionPermit>) -> SessionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        self.total_count.fetch_add(1, Ordering::Relaxed);
        SessionGuard {
            active_count: Arc::clone(&self.active_count),
            request_id,
            _permit: permit,
        }
    }

    /// Get current active session count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Sessions started since startup.
    pub fn total_count(&self) -> u64 {
        self.total_count.load(Ordering::Relaxed)
    }
}

/// Lives as long as the longer of a session's two relay tasks.
#[derive(Debug)]
pub struct SessionGuard {
    active_count: Arc<AtomicU64>,
    request_id: String,
    _permit: Option<ConnectionPermit>,
}

impl SessionGuard {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(request_id = %self.request_id, "Session closed");
    }
}
