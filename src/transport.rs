//! TCP transport and the guarded command writer.
//!
//! The socket is split on connect: the read half is handed to the read
//! loop, which owns it exclusively, while the write half only ever lives
//! inside [`CommandWriter`]. Every write — handshake lines and caller
//! commands alike — goes through the writer's single lock, so torn or
//! interleaved writes are impossible by construction. Reads never
//! contend that lock.

use crate::errors::GrxClientError;
use bytes::Bytes;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// A freshly opened, not yet logged-in connection to the processor.
pub(crate) struct Transport {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
}

impl Transport {
    /// Open a TCP connection to the processor.
    ///
    /// TCP_NODELAY is enabled; scene commands are tiny and latency
    /// matters more than throughput here.
    pub(crate) async fn connect(host: &str, port: u16) -> Result<Self, GrxClientError> {
        let addr = format!("{host}:{port}");
        let stream = TcpStream::connect(&addr).await.map_err(|e| {
            GrxClientError::ConnectionFailed(format!("failed to connect to {addr}: {e}"))
        })?;

        stream.set_nodelay(true).map_err(|e| {
            GrxClientError::ConnectionFailed(format!("failed to set TCP_NODELAY: {e}"))
        })?;

        // Log local and remote addresses for correlation with processor logs
        if let (Ok(local), Ok(peer)) = (stream.local_addr(), stream.peer_addr()) {
            tracing::info!("Connected via TCP: local={} -> remote={}", local, peer);
        } else {
            tracing::info!("Connected to {} via TCP", addr);
        }

        let (reader, writer) = stream.into_split();
        Ok(Self { reader, writer })
    }

    /// Split into the loop-owned read half and the shared write half.
    pub(crate) fn split(self) -> (OwnedReadHalf, OwnedWriteHalf) {
        (self.reader, self.writer)
    }
}

/// The only path to the transport's write half.
///
/// Cloneable; all clones share one async lock over the current write
/// half. `None` means there is no live transport, in which case sends
/// report `false` and are simply lost — commands are fire-and-forget.
#[derive(Clone)]
pub(crate) struct CommandWriter {
    inner: Arc<Mutex<Option<OwnedWriteHalf>>>,
}

impl CommandWriter {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
        }
    }

    /// Install the write half of a newly established transport.
    pub(crate) async fn install(&self, writer: OwnedWriteHalf) {
        *self.inner.lock().await = Some(writer);
    }

    /// Drop the current write half, if any. Called on read-side failure
    /// and on shutdown; a pending `send` will then report `false`.
    pub(crate) async fn clear(&self) {
        if let Some(mut writer) = self.inner.lock().await.take() {
            let _ = writer.shutdown().await;
        }
    }

    /// Write one encoded command under the lock.
    ///
    /// Returns `false` when there is no live transport or the write
    /// fails; a failed write clears the transport so later sends fail
    /// fast while the read loop drives the reconnect.
    pub(crate) async fn send(&self, command: Bytes) -> bool {
        let mut guard = self.inner.lock().await;
        let Some(writer) = guard.as_mut() else {
            tracing::debug!("send with no live transport, command dropped");
            return false;
        };

        tracing::debug!(command = %String::from_utf8_lossy(&command).trim_end(), "send");
        match writer.write_all(&command).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("write failed: {e}");
                *guard = None;
                false
            }
        }
    }

    /// Whether a transport is currently installed.
    pub(crate) async fn is_live(&self) -> bool {
        self.inner.lock().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_without_transport_reports_false() {
        let writer = CommandWriter::new();
        assert!(!writer.send(Bytes::from_static(b":G\r\n")).await);
        assert!(!writer.is_live().await);
    }

    #[tokio::test]
    async fn test_connect_refused_is_connection_failed() {
        // Port 1 on localhost is almost certainly closed.
        let err = Transport::connect("127.0.0.1", 1).await.err();
        assert!(matches!(err, Some(GrxClientError::ConnectionFailed(_))));
    }
}
