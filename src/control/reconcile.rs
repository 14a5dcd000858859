//! Turn configuration reloads into control events.

use tokio::sync::mpsc;

use crate::config::BalancerConfig;
use crate::control::event::{ControlHandle, Event};
use crate::load_balancer::Balancer;

/// Events that move a running balancer from `current` to `next`.
///
/// Only additions are expressible: backends missing from `next` stay
/// registered, and listener or logging changes need a restart.
pub fn diff_events(current: &BalancerConfig, next: &BalancerConfig) -> Vec<Event> {
    let mut events: Vec<Event> = next
        .backends
        .iter()
        .filter(|b| !current.backends.contains(*b))
        .cloned()
        .map(Event::BackendAdd)
        .collect();

    if next.strategy.name != current.strategy.name {
        events.push(Event::StrategyChange(next.strategy.name));
    }

    let removed = current
        .backends
        .iter()
        .filter(|b| !next.backends.contains(*b))
        .count();
    if removed > 0 {
        tracing::warn!(removed, "Backends removed from config stay registered until restart");
    }
    if next.listener != current.listener || next.strategy.ring_size != current.strategy.ring_size {
        tracing::warn!("Listener or ring size changed, restart required to apply");
    }

    events
}

/// Forward reloaded configurations to the control loop until either side closes.
///
/// Backends are never unregistered, so the baseline for the next diff keeps
/// every backend seen so far. Adds for a backend already in the live registry
/// (e.g. one added from the shell) are dropped.
pub async fn forward_config_updates(
    mut current: BalancerConfig,
    mut updates: mpsc::UnboundedReceiver<BalancerConfig>,
    balancer: Balancer,
    control: ControlHandle,
) {
    while let Some(next) = updates.recv().await {
        let snapshot = balancer.snapshot();
        let events: Vec<Event> = diff_events(&current, &next)
            .into_iter()
            .filter(|event| match event {
                Event::BackendAdd(b) => {
                    let registered = snapshot.registry.find(&b.host, b.port).is_some();
                    if registered {
                        tracing::debug!(host = %b.host, port = b.port, "Backend already registered, skipping");
                    }
                    !registered
                }
                _ => true,
            })
            .collect();

        tracing::info!(events = events.len(), "Applying reloaded configuration");
        for event in events {
            if control.send(event).await.is_err() {
                tracing::debug!("Control loop gone, stopping config forwarding");
                return;
            }
        }

        let mut registered = std::mem::take(&mut current.backends);
        for backend in &next.backends {
            if !registered.contains(backend) {
                registered.push(backend.clone());
            }
        }
        current = BalancerConfig {
            backends: registered,
            ..next
        };
    }
}
