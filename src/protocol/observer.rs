//! Connection lifecycle hooks.
//!
//! A server is built with exactly one [`ConnectionObserver`]. Every method has
//! a no-op default, so implementors only override what they care about.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::packet::Packet;
use crate::transport::session::Session;

/// Lifecycle capability injected into the server at construction
#[async_trait]
pub trait ConnectionObserver: Send + Sync + 'static {
    /// A connection was accepted and registered
    async fn on_connect(&self, _session: &Arc<Session>) {}

    /// A session's read loop ended; it is still registered while this runs
    async fn on_disconnect(&self, _session: &Arc<Session>) {}

    /// A packet arrived whose type tag has no registered handler
    async fn on_unknown_packet(&self, _session: &Arc<Session>, _packet: Packet) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ConnectionObserver for NoopObserver {}
