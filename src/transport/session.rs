//! # Session
//!
//! One live client connection: a unique identity, the peer address and the
//! write half of the transport.
//!
//! The read half is owned by the session's dispatch worker and never exposed;
//! everything else (handlers, observers, broadcasts) talks to the client
//! through [`Session::send`] / [`Session::send_packet`].
//!
//! Writes are best-effort. The returned byte count is the only signal of a
//! failed or short write; the error itself is only logged.

use std::fmt;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, Notify};
use tracing::debug;
use uuid::Uuid;

use crate::core::field::Value;
use crate::core::packet::Packet;
use crate::utils::metrics::Metrics;

/// Stable identity of a session, never reused by another connection
pub type SessionId = Uuid;

type BoxedWriter = Pin<Box<dyn AsyncWrite + Send>>;

/// A connected client
pub struct Session {
    id: SessionId,
    peer: SocketAddr,
    writer: Mutex<BoxedWriter>,
    close: Notify,
    metrics: Arc<Metrics>,
}

impl Session {
    pub(crate) fn new<W>(peer: SocketAddr, writer: W, metrics: Arc<Metrics>) -> Self
    where
        W: AsyncWrite + Send + 'static,
    {
        Self {
            id: Uuid::new_v4(),
            peer,
            writer: Mutex::new(Box::pin(writer)),
            close: Notify::new(),
            metrics,
        }
    }

    /// Unique session id, assigned at accept time
    #[inline]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Remote address of the client
    #[inline]
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Build a packet from `values` and write it to the client.
    ///
    /// Returns the number of bytes written. A packet that cannot be built
    /// (oversized, or a string containing NUL) writes nothing and returns 0.
    pub async fn send<I>(&self, packet_type: u8, values: I) -> usize
    where
        I: IntoIterator<Item = Value>,
    {
        match Packet::with_values(packet_type, values) {
            Ok(packet) => self.send_packet(&packet).await,
            Err(e) => {
                debug!(session = %self.id, packet_type, error = %e, "Failed to build packet");
                0
            }
        }
    }

    /// Write a prepared packet to the client, returning the bytes written
    pub async fn send_packet(&self, packet: &Packet) -> usize {
        let bytes = packet.to_bytes();
        let mut writer = self.writer.lock().await;

        let mut written = 0;
        while written < bytes.len() {
            match writer.write(&bytes[written..]).await {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) => {
                    debug!(session = %self.id, error = %e, "Write failed");
                    break;
                }
            }
        }
        if written == bytes.len() {
            if let Err(e) = writer.flush().await {
                debug!(session = %self.id, error = %e, "Flush failed");
            }
            self.metrics.packet_sent(written as u64);
        } else {
            self.metrics.send_failed(written as u64);
        }
        written
    }

    /// Ask the dispatch worker to end this session.
    ///
    /// Cleanup (disconnect hook, unregistering, closing the transport) runs on
    /// the worker as for any other disconnect.
    pub fn close(&self) {
        self.close.notify_one();
    }

    /// Resolves once [`Session::close`] has been called
    pub(crate) async fn closed(&self) {
        self.close.notified().await;
    }

    /// Shut down the write half of the transport
    pub(crate) async fn shutdown(&self) {
        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.shutdown().await {
            debug!(session = %self.id, error = %e, "Transport shutdown failed");
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::values;
    use tokio::io::AsyncReadExt;

    fn peer() -> SocketAddr {
        "127.0.0.1:4000".parse().unwrap()
    }

    #[tokio::test]
    async fn send_writes_encoded_packet() {
        let (client, server) = tokio::io::duplex(64);
        let metrics = Arc::new(Metrics::new());
        let session = Session::new(peer(), server, metrics.clone());

        let n = session.send(149, values![1u8]).await;
        assert_eq!(n, 4);

        let mut client = client;
        let mut buf = [0u8; 4];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [4, 0, 149, 1]);
        assert_eq!(metrics.snapshot().bytes_sent, 4);
    }

    #[tokio::test]
    async fn send_to_closed_peer_reports_short_write() {
        let (client, server) = tokio::io::duplex(64);
        drop(client);
        let metrics = Arc::new(Metrics::new());
        let session = Session::new(peer(), server, metrics.clone());

        assert_eq!(session.send(1, values![7u32]).await, 0);
        assert_eq!(metrics.snapshot().send_failures, 1);
    }

    #[tokio::test]
    async fn unbuildable_packet_sends_nothing() {
        let session = Session::new(peer(), tokio::io::sink(), Arc::new(Metrics::new()));
        assert_eq!(session.send(1, values!["bad\0string"]).await, 0);
    }

    #[test]
    fn ids_are_unique() {
        let metrics = Arc::new(Metrics::new());
        let a = Session::new(peer(), tokio::io::sink(), metrics.clone());
        let b = Session::new(peer(), tokio::io::sink(), metrics);
        assert_ne!(a.id(), b.id());
    }
}
