//! Connection dispatch.
//!
//! # Responsibilities
//! - Generate a fresh request id per inbound connection
//! - Ask the active strategy for a backend
//! - Dial the backend (optionally bounded by a connect timeout)
//! - Hand both streams to the relay tasks
//!
//! # Design Decisions
//! - Failures are scoped to the one connection: the client gets a fixed
//!   error payload and is closed, the balancer keeps serving
//! - No failover to another backend and no retry

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::config::TimeoutConfig;
use crate::load_balancer::{backend::Backend, Balancer, RequestDescriptor};
use crate::net::connection::ConnectionTracker;
use crate::net::listener::ConnectionPermit;
use crate::proxy::relay::spawn_relays;

/// Payload written to a client whose connection cannot be proxied.
pub const BACKEND_UNAVAILABLE: &[u8] = b"backend not available";

/// Why one connection could not be proxied.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no backend registered")]
    NoBackends,

    #[error("backend {backend} unavailable: {source}")]
    BackendUnavailable {
        backend: String,
        #[source]
        source: io::Error,
    },

    #[error("connect to backend {backend} timed out after {timeout:?}")]
    ConnectTimeout { backend: String, timeout: Duration },
}

/// A successfully dispatched connection.
#[derive(Debug, Clone)]
pub struct Session {
    pub request_id: String,
    pub backend: Arc<Backend>,
}

/// Turns accepted connections into relayed sessions.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    balancer: Balancer,
    tracker: ConnectionTracker,
    connect_timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(balancer: Balancer, tracker: ConnectionTracker, timeouts: &TimeoutConfig) -> Self {
        let connect_timeout = match timeouts.connect_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self {
            balancer,
            tracker,
            connect_timeout,
        }
    }

    /// Dispatch one accepted connection.
    ///
    /// Returns once the relays are spawned, without waiting for them.
    pub async fn dispatch(
        &self,
        mut client: TcpStream,
        peer: SocketAddr,
        permit: Option<ConnectionPermit>,
    ) -> Result<Session, DispatchError> {
        let request = RequestDescriptor::generate(peer);

        let Some(backend) = self.balancer.next_backend(&request) else {
            reject(&mut client).await;
            return Err(DispatchError::NoBackends);
        };

        tracing::info!(
            request_id = %request.request_id,
            peer_addr = %peer,
            backend = %backend,
            "Dispatching connection"
        );

        let upstream = match self.connect(&backend).await {
            Ok(stream) => stream,
            Err(e) => {
                reject(&mut client).await;
                return Err(e);
            }
        };

        backend.record_request();
        let session = self.tracker.track(request.request_id.clone(), permit);
        let _relays = spawn_relays(client, upstream, session);

        Ok(Session {
            request_id: request.request_id,
            backend,
        })
    }

    async fn connect(&self, backend: &Backend) -> Result<TcpStream, DispatchError> {
        let address = backend.key();
        let connect = TcpStream::connect(address.as_str());

        let result = match self.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, connect)
                .await
                .map_err(|_| DispatchError::ConnectTimeout {
                    backend: address.clone(),
                    timeout,
                })?,
            None => connect.await,
        };

        result.map_err(|source| DispatchError::BackendUnavailable {
            backend: address,
            source,
        })
    }
}

/// Best-effort error payload, then close.
async fn reject(client: &mut TcpStream) {
    let _ = client.write_all(BACKEND_UNAVAILABLE).await;
    let _ = client.shutdown().await;
}
