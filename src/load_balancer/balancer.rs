//! Shared balancer state.
//!
//! # Responsibilities
//! - Publish the registry and the active strategy as one immutable snapshot
//! - Serve lock-free lookups to every dispatch task
//! - Apply copy-on-write updates on behalf of the control loop

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::load_balancer::{
    backend::{Backend, BackendRegistry},
    build_strategy, BalancingStrategy, RequestDescriptor, StrategyError, StrategyKind,
};

/// Registry and strategy as seen by one lookup.
#[derive(Debug)]
pub struct Snapshot {
    pub registry: BackendRegistry,
    pub strategy: Box<dyn BalancingStrategy>,
}

impl Snapshot {
    pub fn kind(&self) -> StrategyKind {
        self.strategy.kind()
    }
}

/// Handle to the balancer state. Cheap to clone.
///
/// Reads go through `load()` and never block. The `apply_*` methods are
/// meant for a single writer (the control loop); concurrent writers would
/// lose updates.
#[derive(Debug, Clone)]
pub struct Balancer {
    inner: Arc<ArcSwap<Snapshot>>,
    ring_size: usize,
}

impl Balancer {
    pub fn new(registry: BackendRegistry, kind: StrategyKind, ring_size: usize) -> Self {
        let strategy = build_strategy(kind, registry.as_slice(), ring_size);
        Self {
            inner: Arc::new(ArcSwap::from_pointee(Snapshot { registry, strategy })),
            ring_size,
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.load_full()
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.inner.load().kind()
    }

    /// All registered backends, in registration order.
    pub fn backends(&self) -> Vec<Arc<Backend>> {
        self.inner.load().registry.as_slice().to_vec()
    }

    /// Select a backend for a live connection.
    pub fn next_backend(&self, request: &RequestDescriptor) -> Option<Arc<Backend>> {
        self.inner.load().strategy.next_backend(request)
    }

    /// Dry-run: where would this request id go right now.
    pub fn route_for(&self, request_id: &str) -> Option<Arc<Backend>> {
        self.inner
            .load()
            .strategy
            .peek_backend(&RequestDescriptor::with_id(request_id))
    }

    /// Routing table of the active strategy.
    pub fn describe_topology(&self) -> String {
        self.inner.load().strategy.describe_topology()
    }

    /// Replace the active strategy with a fresh one over the current registry.
    pub fn apply_strategy_change(&self, kind: StrategyKind) {
        let current = self.inner.load_full();
        let strategy = build_strategy(kind, current.registry.as_slice(), self.ring_size);
        self.inner.store(Arc::new(Snapshot {
            registry: current.registry.clone(),
            strategy,
        }));
        tracing::info!(strategy = %kind, "Balancing strategy changed");
    }

    /// Append a backend to the registry and the active strategy.
    pub fn apply_backend_add(&self, backend: Arc<Backend>) {
        let current = self.inner.load_full();
        let mut registry = current.registry.clone();
        let mut strategy = current.strategy.clone_box();
        registry.add(backend.clone());
        strategy.register_backend(backend.clone());
        self.inner.store(Arc::new(Snapshot { registry, strategy }));
        tracing::info!(backend = %backend, "Backend registered");
    }

    /// Edit the pinned index of the active strategy.
    pub fn apply_strategy_edit(&self, index: usize) -> Result<(), StrategyError> {
        let current = self.inner.load_full();
        let mut strategy = current.strategy.clone_box();
        strategy.set_pinned_index(index)?;
        self.inner.store(Arc::new(Snapshot {
            registry: current.registry.clone(),
            strategy,
        }));
        tracing::info!(index, "Static strategy index changed");
        Ok(())
    }
}
