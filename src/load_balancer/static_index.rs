//! Static (pinned) load balancing strategy.

use std::fmt::Write;
use std::sync::Arc;

use crate::load_balancer::{
    backend::Backend, BalancingStrategy, RequestDescriptor, StrategyError, StrategyKind,
};

/// Routes every request to `backends[index]`.
///
/// The index is the only runtime-editable knob of any strategy.
#[derive(Debug, Default, Clone)]
pub struct StaticIndex {
    index: usize,
    backends: Vec<Arc<Backend>>,
}

impl StaticIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl BalancingStrategy for StaticIndex {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Static
    }

    fn init(&mut self, backends: &[Arc<Backend>]) {
        self.index = 0;
        self.backends = backends.to_vec();
    }

    fn next_backend(&self, _request: &RequestDescriptor) -> Option<Arc<Backend>> {
        self.backends.get(self.index).cloned()
    }

    fn register_backend(&mut self, backend: Arc<Backend>) {
        self.backends.push(backend);
    }

    fn describe_topology(&self) -> String {
        let mut out = String::new();
        for (index, backend) in self.backends.iter().enumerate() {
            let mark = if index == self.index { "x" } else { " " };
            let _ = writeln!(out, "      [{}] {}", mark, backend);
        }
        out
    }

    fn set_pinned_index(&mut self, index: usize) -> Result<(), StrategyError> {
        if index >= self.backends.len() {
            return Err(StrategyError::IndexOutOfRange {
                index,
                len: self.backends.len(),
            });
        }
        self.index = index;
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn BalancingStrategy> {
        Box::new(self.clone())
    }
}
