//! Bidirectional byte relay.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use crate::net::connection::SessionGuard;

/// Spawn the two relay tasks of a session and return immediately.
///
/// Each task copies until EOF or an I/O error, then shuts down the write
/// side it was feeding. The session guard is released when both end.
pub fn spawn_relays(
    client: TcpStream,
    upstream: TcpStream,
    session: SessionGuard,
) -> (JoinHandle<u64>, JoinHandle<u64>) {
    let session = Arc::new(session);
    let (client_read, client_write) = client.into_split();
    let (upstream_read, upstream_write) = upstream.into_split();

    let to_backend = tokio::spawn(relay(client_read, upstream_write, "client->backend", session.clone()));
    let to_client = tokio::spawn(relay(upstream_read, client_write, "backend->client", session));
    (to_backend, to_client)
}

/// Copy one direction. Returns the number of bytes moved.
async fn relay<R, W>(mut reader: R, mut writer: W, direction: &'static str, session: Arc<SessionGuard>) -> u64
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let bytes = match tokio::io::copy(&mut reader, &mut writer).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(request_id = %session.request_id(), direction, error = %e, "Relay ended with I/O error");
            0
        }
    };
    let _ = writer.shutdown().await;
    tracing::trace!(request_id = %session.request_id(), direction, bytes, "Relay finished");
    bytes
}
