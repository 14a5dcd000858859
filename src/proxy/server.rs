//! Load balancer server.
//!
//! # Responsibilities
//! - Build the balancer state from configuration
//! - Own the control channel and spawn the control loop
//! - Run the accept loop, one dispatch task per connection

use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::BalancerConfig;
use crate::control::{ControlHandle, ControlLoop, Event, CONTROL_CHANNEL_CAPACITY};
use crate::load_balancer::{BackendRegistry, Balancer};
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{Accepted, Listener, ListenerError};
use crate::proxy::dispatcher::{DispatchError, Dispatcher};

/// Pause after a failed accept so a persistent error does not spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// TCP load balancer.
pub struct ProxyServer {
    balancer: Balancer,
    control: ControlHandle,
    events: mpsc::Receiver<Event>,
    dispatcher: Dispatcher,
    tracker: ConnectionTracker,
}

impl ProxyServer {
    /// Create a new server with the given configuration.
    pub fn new(config: &BalancerConfig) -> Self {
        let registry = BackendRegistry::from_config(&config.backends);
        let balancer = Balancer::new(registry, config.strategy.name, config.strategy.ring_size);
        let (control, events) = ControlHandle::channel(CONTROL_CHANNEL_CAPACITY);
        let tracker = ConnectionTracker::new();
        let dispatcher = Dispatcher::new(balancer.clone(), tracker.clone(), &config.timeouts);

        tracing::info!(
            strategy = %config.strategy.name,
            backends = config.backends.len(),
            ring_size = config.strategy.ring_size,
            "Balancer initialized"
        );

        Self {
            balancer,
            control,
            events,
            dispatcher,
            tracker,
        }
    }

    /// Read-only view of the balancer state.
    pub fn balancer(&self) -> Balancer {
        self.balancer.clone()
    }

    /// Sender for control events.
    pub fn control(&self) -> ControlHandle {
        self.control.clone()
    }

    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Spawn the control loop and serve connections from `listener`.
    ///
    /// Returns `Ok` once the listener is closed through its shutdown handle.
    pub async fn run(self, listener: Listener) -> Result<(), ListenerError> {
        let Self {
            balancer,
            events,
            dispatcher,
            ..
        } = self;

        tokio::spawn(ControlLoop::new(balancer, events).run());

        if let Ok(addr) = listener.local_addr() {
            tracing::info!(address = %addr, "Load balancer accepting connections");
        }

        loop {
            match listener.accept().await {
                Ok(Accepted { stream, peer, permit }) => {
                    let dispatcher = dispatcher.clone();
                    tokio::spawn(async move {
                        if let Err(e) = dispatcher.dispatch(stream, peer, Some(permit)).await {
                            match e {
                                DispatchError::NoBackends => {
                                    tracing::error!(peer_addr = %peer, "No backend registered, connection refused")
                                }
                                e => tracing::warn!(peer_addr = %peer, error = %e, "Dispatch failed"),
                            }
                        }
                    });
                }
                Err(ListenerError::Accept(e)) => {
                    tracing::warn!(error = %e, "Unable to accept connection, continuing");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
                Err(ListenerError::Closed) => {
                    tracing::info!("Listener closed, accept loop stopped");
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
    }
}
