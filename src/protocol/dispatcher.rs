use crate::core::packet::Packet;
use crate::protocol::observer::ConnectionObserver;
use crate::transport::session::Session;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Packet handler for one type tag.
///
/// Implemented for every `Fn(Arc<Session>, Packet) -> impl Future<Output = ()>`
/// closure, so registration normally looks like
/// `dispatcher.register(8, |session, packet| async move { .. })`.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, session: Arc<Session>, packet: Packet) -> BoxFuture<'static, ()>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Arc<Session>, Packet) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn call(&self, session: Arc<Session>, packet: Packet) -> BoxFuture<'static, ()> {
        Box::pin((self)(session, packet))
    }
}

/// Where a dispatched packet ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    Unknown,
}

/// Type-tag → handler table.
///
/// Filled during setup, then frozen behind an `Arc` by the server builder;
/// there is no way to mutate it once the server runs.
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<u8, Box<dyn Handler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an async closure for `packet_type`; a later registration replaces it
    pub fn register<F, Fut>(&mut self, packet_type: u8, handler: F)
    where
        F: Fn(Arc<Session>, Packet) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.register_handler(packet_type, handler);
    }

    /// Register any [`Handler`] implementation for `packet_type`
    pub fn register_handler<H: Handler>(&mut self, packet_type: u8, handler: H) {
        if self.handlers.insert(packet_type, Box::new(handler)).is_some() {
            debug!(packet_type, "Replaced existing handler");
        }
    }

    pub fn contains(&self, packet_type: u8) -> bool {
        self.handlers.contains_key(&packet_type)
    }

    /// Number of registered type tags
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Route `packet` to its handler, or to the observer's unknown-packet hook
    pub async fn dispatch(
        &self,
        session: &Arc<Session>,
        packet: Packet,
        observer: &dyn ConnectionObserver,
    ) -> Dispatch {
        match self.handlers.get(&packet.packet_type()) {
            Some(handler) => {
                handler.call(session.clone(), packet).await;
                Dispatch::Handled
            }
            None => {
                observer.on_unknown_packet(session, packet).await;
                Dispatch::Unknown
            }
        }
    }
}
