//! Consistent-hash load balancing strategy.
//!
//! # Ring Layout
//! ```text
//! slot:   0  1  2  3  4  5  6  7  8  9 ... 18
//!               b1       b2    b4    b3
//!                   ▲
//!        request hashed to 3 → first slot > 3 → b2
//!        request hashed past the last slot → wraps to b1
//! ```
//!
//! # Design Decisions
//! - Slot = sum of MD5 digest bytes modulo the ring size (default 19)
//! - One ring entry per slot; a later backend on a taken slot replaces the earlier one
//! - Lookup uses the strict upper bound, so a request on an occupied slot
//!   goes to the *next* backend

use std::fmt::Write;
use std::sync::Arc;

use md5::{Digest, Md5};

use crate::load_balancer::{
    backend::Backend, BalancingStrategy, RequestDescriptor, StrategyKind,
};

/// Number of ring slots unless configured otherwise.
pub const DEFAULT_RING_SIZE: usize = 19;

/// Maps a key to an unbounded hash value; the ring reduces it modulo its size.
pub type KeyHasher = fn(&str) -> u64;

/// Sum of the bytes of the MD5 digest of `key`.
pub fn md5_byte_sum(key: &str) -> u64 {
    Md5::digest(key.as_bytes())
        .iter()
        .map(|b| u64::from(*b))
        .sum()
}

/// One occupied position on the ring.
#[derive(Debug, Clone)]
pub struct RingEntry {
    pub slot: usize,
    pub backend: Arc<Backend>,
}

/// Consistent-hash ring keyed by request id.
#[derive(Debug, Clone)]
pub struct ConsistentHash {
    /// Sorted ascending by slot, unique slots.
    ring: Vec<RingEntry>,
    ring_size: usize,
    hasher: KeyHasher,
}

impl ConsistentHash {
    pub fn new(ring_size: usize) -> Self {
        Self::with_hasher(ring_size, md5_byte_sum)
    }

    /// Ring with a custom key hasher.
    pub fn with_hasher(ring_size: usize, hasher: KeyHasher) -> Self {
        Self {
            ring: Vec::new(),
            ring_size: ring_size.max(1),
            hasher,
        }
    }

    pub fn ring_size(&self) -> usize {
        self.ring_size
    }

    /// Occupied entries in slot order.
    pub fn entries(&self) -> &[RingEntry] {
        &self.ring
    }

    /// Slot a key hashes to.
    pub fn slot_for(&self, key: &str) -> usize {
        ((self.hasher)(key) % self.ring_size as u64) as usize
    }

    fn insert(&mut self, backend: Arc<Backend>) {
        let slot = self.slot_for(&backend.key());
        match self.ring.binary_search_by_key(&slot, |e| e.slot) {
            Ok(index) => {
                tracing::warn!(
                    slot,
                    replaced = %self.ring[index].backend,
                    backend = %backend,
                    "Ring slot collision, later backend takes the slot"
                );
                self.ring[index].backend = backend;
            }
            Err(index) => self.ring.insert(index, RingEntry { slot, backend }),
        }
    }
}

impl Default for ConsistentHash {
    fn default() -> Self {
        Self::new(DEFAULT_RING_SIZE)
    }
}

impl BalancingStrategy for ConsistentHash {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Hash
    }

    fn init(&mut self, backends: &[Arc<Backend>]) {
        self.ring.clear();
        for backend in backends {
            self.insert(backend.clone());
        }
    }

    fn next_backend(&self, request: &RequestDescriptor) -> Option<Arc<Backend>> {
        if self.ring.is_empty() {
            return None;
        }
        let slot = self.slot_for(&request.request_id);
        let index = self.ring.partition_point(|e| e.slot <= slot);
        Some(self.ring[index % self.ring.len()].backend.clone())
    }

    fn register_backend(&mut self, backend: Arc<Backend>) {
        self.insert(backend);
    }

    fn describe_topology(&self) -> String {
        let mut out = String::new();
        let mut entries = self.ring.iter().peekable();
        for slot in 0..self.ring_size {
            match entries.next_if(|e| e.slot == slot) {
                Some(entry) => {
                    let _ = writeln!(out, "      [{:2}] {}", slot, entry.backend);
                }
                None => {
                    let _ = writeln!(out, "      [{:2}] -", slot);
                }
            }
        }
        out
    }

    fn clone_box(&self) -> Box<dyn BalancingStrategy> {
        Box::new(self.clone())
    }
}
