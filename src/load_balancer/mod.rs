//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Connection accepted → RequestDescriptor (fresh request id)
//!     → balancer.rs (current snapshot of registry + strategy)
//!     → Apply the active strategy:
//!         - round_robin.rs (rotate through backends)
//!         - static_index.rs (pin every request to one backend)
//!         - hashed.rs (consistent-hash ring keyed by request id)
//!     → Backend returned to the dispatcher
//! ```
//!
//! # Design Decisions
//! - Strategies are trait objects; the active one is replaced wholesale
//! - Registry and strategy are published together as one immutable snapshot
//! - Only the control loop writes; lookups never take a lock
//! - An empty backend set yields `None`, never a panic

pub mod backend;
pub mod balancer;
pub mod hashed;
pub mod round_robin;
pub mod static_index;

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use self::backend::Backend;
use self::hashed::ConsistentHash;
use self::round_robin::RoundRobin;
use self::static_index::StaticIndex;

pub use self::backend::BackendRegistry;
pub use self::balancer::{Balancer, Snapshot};

/// Per-connection request descriptor handed to strategies.
///
/// The connection itself stays with the dispatcher; only its identity
/// travels here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// Unique per inbound connection. The consistent-hash key.
    pub request_id: String,
    /// Client address, when the descriptor comes from a real connection.
    pub peer: Option<SocketAddr>,
}

impl RequestDescriptor {
    /// Descriptor with a freshly generated UUID v4 request id.
    pub fn generate(peer: SocketAddr) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            peer: Some(peer),
        }
    }

    /// Descriptor for a known request id, e.g. a routing dry-run.
    pub fn with_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            peer: None,
        }
    }
}

/// Names of the available strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum StrategyKind {
    RoundRobin,
    Static,
    #[default]
    Hash,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::RoundRobin => "round-robin",
            StrategyKind::Static => "static",
            StrategyKind::Hash => "hash",
        }
    }

    /// Parse a strategy name. Unrecognized names fall back to `Hash`.
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "round-robin" => StrategyKind::RoundRobin,
            "static" => StrategyKind::Static,
            "hash" => StrategyKind::Hash,
            other => {
                tracing::warn!(strategy = %other, "Unknown strategy name, falling back to hash");
                StrategyKind::Hash
            }
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for StrategyKind {
    fn from(name: String) -> Self {
        StrategyKind::from_name(&name)
    }
}

impl From<StrategyKind> for String {
    fn from(kind: StrategyKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Errors reported by strategy edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyError {
    /// The active strategy has no editable knob.
    #[error("this balancing strategy ({0}) does not support edits")]
    EditUnsupported(StrategyKind),

    /// Pinned index outside the registered backends.
    #[error("backend index {index} out of range (have {len} backends)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// A backend selection algorithm.
///
/// Implementations are held in an immutable snapshot. Lookups run
/// concurrently through `&self`; mutation (`init`, `register_backend`,
/// `set_pinned_index`) happens only on a private copy obtained through
/// `clone_box` before it is published.
pub trait BalancingStrategy: Send + Sync + fmt::Debug {
    /// Which strategy this is.
    fn kind(&self) -> StrategyKind;

    /// Reset the strategy state over the given backends.
    fn init(&mut self, backends: &[Arc<Backend>]);

    /// Select the backend for a request. `None` when no backend is registered.
    fn next_backend(&self, request: &RequestDescriptor) -> Option<Arc<Backend>>;

    /// Same selection as `next_backend` without advancing any internal cursor.
    fn peek_backend(&self, request: &RequestDescriptor) -> Option<Arc<Backend>> {
        self.next_backend(request)
    }

    /// Add one backend; visible to every later lookup.
    fn register_backend(&mut self, backend: Arc<Backend>);

    /// Human-readable routing table, one line per entry.
    fn describe_topology(&self) -> String;

    /// Pin traffic to `backends[index]`. Only the static strategy supports it.
    fn set_pinned_index(&mut self, _index: usize) -> Result<(), StrategyError> {
        Err(StrategyError::EditUnsupported(self.kind()))
    }

    /// Copy for copy-on-write updates.
    fn clone_box(&self) -> Box<dyn BalancingStrategy>;
}

/// Build and initialize a strategy over `backends`.
pub fn build_strategy(
    kind: StrategyKind,
    backends: &[Arc<Backend>],
    ring_size: usize,
) -> Box<dyn BalancingStrategy> {
    let mut strategy: Box<dyn BalancingStrategy> = match kind {
        StrategyKind::RoundRobin => Box::new(RoundRobin::new()),
        StrategyKind::Static => Box::new(StaticIndex::new()),
        StrategyKind::Hash => Box::new(ConsistentHash::new(ring_size)),
    };
    strategy.init(backends);
    strategy
}
