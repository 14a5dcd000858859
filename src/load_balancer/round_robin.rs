//! Round-robin load balancing strategy.

use std::fmt::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::{
    backend::Backend, BalancingStrategy, RequestDescriptor, StrategyKind,
};

/// Round-robin selector.
///
/// The cursor advances before it is read, so starting from 0 the first
/// lookup returns index 1 and index 0 comes last in each cycle.
/// The cursor is shared between snapshot copies: registering a backend
/// does not reset the rotation.
#[derive(Debug, Default, Clone)]
pub struct RoundRobin {
    cursor: Arc<AtomicUsize>,
    backends: Vec<Arc<Backend>>,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current cursor position, always in `[0, len)` for a non-empty set.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }
}

impl BalancingStrategy for RoundRobin {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RoundRobin
    }

    fn init(&mut self, backends: &[Arc<Backend>]) {
        self.cursor = Arc::new(AtomicUsize::new(0));
        self.backends = backends.to_vec();
    }

    fn next_backend(&self, _request: &RequestDescriptor) -> Option<Arc<Backend>> {
        let len = self.backends.len();
        if len == 0 {
            return None;
        }

        let prev = self
            .cursor
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |i| Some((i + 1) % len))
            .unwrap_or_else(|i| i);
        Some(self.backends[(prev + 1) % len].clone())
    }

    fn peek_backend(&self, _request: &RequestDescriptor) -> Option<Arc<Backend>> {
        let len = self.backends.len();
        if len == 0 {
            return None;
        }
        Some(self.backends[(self.cursor() + 1) % len].clone())
    }

    fn register_backend(&mut self, backend: Arc<Backend>) {
        self.backends.push(backend);
    }

    fn describe_topology(&self) -> String {
        let mut out = String::new();
        for (index, backend) in self.backends.iter().enumerate() {
            let _ = writeln!(out, "      [{}] {}", index, backend);
        }
        out
    }

    fn clone_box(&self) -> Box<dyn BalancingStrategy> {
        Box::new(self.clone())
    }
}
