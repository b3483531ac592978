//! # Session Registry
//!
//! The set of live sessions, shared by every connection worker.
//!
//! ## Features
//! - **Thread-safe**: every insert, remove and iteration goes through one `Arc<Mutex<>>`
//! - **Lock-free sends**: broadcasts snapshot the sessions and write outside the lock
//! - **Isolated failures**: a slow or broken session never holds up delivery to the others
//!
//! ## Usage
//! ```ignore
//! let registry = SessionRegistry::new();
//! registry.insert(session.clone()).await;
//! let delivered = registry.broadcast(114, values![1u8, "Liplay"]).await;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use super::session::{Session, SessionId};
use crate::core::field::Value;
use crate::core::packet::{Packet, HEADER_SIZE};

/// Thread-safe registry of connected sessions
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<HashMap<SessionId, Arc<Session>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session under its id
    pub async fn insert(&self, session: Arc<Session>) {
        let mut sessions = self.inner.lock().await;
        sessions.insert(session.id(), session);
        trace!(session_count = sessions.len(), "Session registered");
    }

    /// Unregister a session, returning it if it was present
    pub async fn remove(&self, id: &SessionId) -> Option<Arc<Session>> {
        let mut sessions = self.inner.lock().await;
        let removed = sessions.remove(id);
        trace!(session_count = sessions.len(), "Session unregistered");
        removed
    }

    /// Look up a live session
    pub async fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.inner.lock().await.get(id).cloned()
    }

    /// Number of live sessions
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Handles to every live session at this instant
    pub async fn snapshot(&self) -> Vec<Arc<Session>> {
        self.inner.lock().await.values().cloned().collect()
    }

    /// Build one packet and write it to every live session.
    ///
    /// Returns the number of sessions that received the whole packet, or 0 if
    /// the packet could not be built.
    pub async fn broadcast<I>(&self, packet_type: u8, values: I) -> usize
    where
        I: IntoIterator<Item = Value>,
    {
        match Packet::with_values(packet_type, values) {
            Ok(packet) => self.broadcast_packet(&packet).await,
            Err(e) => {
                debug!(packet_type, error = %e, "Failed to build broadcast packet");
                0
            }
        }
    }

    /// Write `packet` to every live session.
    ///
    /// Sends run concurrently and independently; the return value counts the
    /// sessions that received the whole packet.
    pub async fn broadcast_packet(&self, packet: &Packet) -> usize {
        let sessions = self.snapshot().await;
        let expected = HEADER_SIZE + packet.remaining();

        let results = join_all(sessions.iter().map(|s| s.send_packet(packet))).await;
        let delivered = results.into_iter().filter(|&n| n == expected).count();

        debug!(
            packet_type = packet.packet_type(),
            recipients = sessions.len(),
            delivered,
            "Broadcast complete"
        );
        delivered
    }
}
