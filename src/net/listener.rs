//! Bounded client listener.
//!
//! A connection is taken off the kernel backlog only once one of the
//! `max_connections` session slots is free, and the slot travels with the
//! session. Closing the listener through its [`ListenerShutdown`] handle wakes
//! a pending `accept` with [`ListenerError::Closed`]; sessions already handed
//! to the dispatcher keep running.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};

use crate::config::ListenerConfig;

#[derive(Debug, Error)]
pub enum ListenerError {
    /// Fatal at startup.
    #[error("Failed to bind: {0}")]
    Bind(std::io::Error),

    /// One connection failed; the listener stays usable.
    #[error("Failed to accept: {0}")]
    Accept(std::io::Error),

    #[error("Listener closed")]
    Closed,
}

/// One accepted client connection and the session slot it occupies.
#[derive(Debug)]
pub struct Accepted {
    pub stream: TcpStream,
    pub peer: SocketAddr,
    pub permit: ConnectionPermit,
}

/// Closes a [`Listener`] from outside the accept loop. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ListenerShutdown {
    closed: Arc<watch::Sender<bool>>,
    slots: Arc<Semaphore>,
}

impl ListenerShutdown {
    /// Stop accepting. Idempotent.
    pub fn close(&self) {
        self.slots.close();
        if !self.closed.send_replace(true) {
            tracing::info!("Listener closing");
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    slots: Arc<Semaphore>,
    max_connections: usize,
    closed: watch::Receiver<bool>,
    shutdown: ListenerShutdown,
}

impl Listener {
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
            ListenerError::Bind(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })?;
        let inner = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;

        let slots = Arc::new(Semaphore::new(config.max_connections));
        let (closed_tx, closed) = watch::channel(false);
        let shutdown = ListenerShutdown {
            closed: Arc::new(closed_tx),
            slots: Arc::clone(&slots),
        };

        tracing::info!(
            address = %inner.local_addr().map_err(ListenerError::Bind)?,
            max_connections = config.max_connections,
            "Listener bound"
        );

        Ok(Self {
            inner,
            slots,
            max_connections: config.max_connections,
            closed,
            shutdown,
        })
    }

    /// Handle that closes this listener.
    pub fn shutdown_handle(&self) -> ListenerShutdown {
        self.shutdown.clone()
    }

    /// Wait for a free slot, then accept the next connection.
    pub async fn accept(&self) -> Result<Accepted, ListenerError> {
        let mut closed = self.closed.clone();
        tokio::select! {
            biased;
            () = wait_closed(&mut closed) => Err(ListenerError::Closed),
            accepted = self.accept_bounded() => accepted,
        }
    }

    async fn accept_bounded(&self) -> Result<Accepted, ListenerError> {
        let permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| ListenerError::Closed)?;
        let (stream, peer) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(
            peer_addr = %peer,
            available_permits = self.slots.available_permits(),
            "Connection accepted"
        );

        Ok(Accepted {
            stream,
            peer,
            permit: ConnectionPermit { _permit: permit },
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Free session slots.
    pub fn available_permits(&self) -> usize {
        self.slots.available_permits()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    while !*closed.borrow_and_update() {
        if closed.changed().await.is_err() {
            return;
        }
    }
}

/// A session slot, released on drop.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: OwnedSemaphorePermit,
}
