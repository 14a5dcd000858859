//! The control loop: sole writer of the balancer state.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::control::event::Event;
use crate::load_balancer::backend::Backend;
use crate::load_balancer::Balancer;

/// Drains control events one at a time and applies them.
pub struct ControlLoop {
    balancer: Balancer,
    events: mpsc::Receiver<Event>,
}

impl ControlLoop {
    pub fn new(balancer: Balancer, events: mpsc::Receiver<Event>) -> Self {
        Self { balancer, events }
    }

    /// Run until an `Exit` event arrives or every sender is dropped.
    ///
    /// Exiting does not close the listener or in-flight connections.
    pub async fn run(mut self) {
        tracing::info!("Control loop started");
        while let Some(event) = self.events.recv().await {
            tracing::debug!(event = event.name(), "Control event received");
            if !self.apply(event) {
                tracing::info!("Control loop terminating");
                return;
            }
        }
        tracing::info!("Control channel closed, control loop stopped");
    }

    /// Apply one event. Returns `false` when the loop should stop.
    fn apply(&self, event: Event) -> bool {
        match event {
            Event::Exit => return false,
            Event::BackendAdd(config) => {
                self.balancer
                    .apply_backend_add(Arc::new(Backend::from(&config)));
            }
            Event::StrategyChange(kind) => {
                self.balancer.apply_strategy_change(kind);
            }
            Event::StrategyEdit { index, reply } => {
                let result = self.balancer.apply_strategy_edit(index);
                if let Err(e) = &result {
                    tracing::warn!(index, error = %e, "Strategy edit rejected");
                }
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::event::{ControlError, ControlHandle};
    use crate::load_balancer::{BackendRegistry, StrategyError, StrategyKind};

    fn balancer(kind: StrategyKind) -> Balancer {
        let registry: BackendRegistry = vec![
            Arc::new(Backend::new("localhost", 8081)),
            Arc::new(Backend::new("localhost", 8082)),
        ]
        .into();
        Balancer::new(registry, kind, 19)
    }

    #[tokio::test]
    async fn test_applies_events_in_order() {
        let balancer = balancer(StrategyKind::Hash);
        let (handle, rx) = ControlHandle::channel(8);
        let task = tokio::spawn(ControlLoop::new(balancer.clone(), rx).run());

        handle.add_backend("localhost", 8083).await.unwrap();
        handle.change_strategy(StrategyKind::Static).await.unwrap();
        handle.edit_strategy(2).await.unwrap();
        handle.exit().await.unwrap();
        task.await.unwrap();

        assert_eq!(balancer.strategy_kind(), StrategyKind::Static);
        assert_eq!(balancer.backends().len(), 3);
        assert_eq!(balancer.route_for("x").unwrap().port, 8083);
    }

    #[tokio::test]
    async fn test_edit_rejected_on_non_static() {
        let balancer = balancer(StrategyKind::RoundRobin);
        let (handle, rx) = ControlHandle::channel(8);
        tokio::spawn(ControlLoop::new(balancer.clone(), rx).run());

        let err = handle.edit_strategy(0).await.unwrap_err();
        assert!(matches!(
            err,
            ControlError::Strategy(StrategyError::EditUnsupported(StrategyKind::RoundRobin))
        ));

        // The loop keeps running after a rejection.
        handle.change_strategy(StrategyKind::Static).await.unwrap();
        handle.edit_strategy(1).await.unwrap();
        assert_eq!(balancer.route_for("x").unwrap().port, 8082);
    }

    #[tokio::test]
    async fn test_exit_closes_channel() {
        let (handle, rx) = ControlHandle::channel(8);
        let task = tokio::spawn(ControlLoop::new(balancer(StrategyKind::Hash), rx).run());

        handle.exit().await.unwrap();
        task.await.unwrap();

        assert!(handle.is_closed());
        assert!(matches!(
            handle.change_strategy(StrategyKind::Static).await,
            Err(ControlError::Closed)
        ));
    }
}
