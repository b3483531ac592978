//! # Packet Server
//!
//! Owns the handler table, the lifecycle observer and the session registry,
//! and runs the accept loop.
//!
//! Handlers and the observer are supplied to [`ServerBuilder`] before the
//! server starts; the built [`Server`] has no way to change them.
//!
//! ## Example
//! ```no_run
//! use packet_server::{values, Server};
//!
//! # async fn run() -> packet_server::Result<()> {
//! let server = Server::builder()
//!     .on(9, |session, _packet| async move {
//!         session.send(125, values![0u8, 604_800i32]).await;
//!     })
//!     .build();
//!
//! server.start("0.0.0.0:30001").await
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, instrument};

use crate::config::{Config, ServerConfig};
use crate::core::field::Value;
use crate::core::packet::Packet;
use crate::error::Result;
use crate::protocol::dispatcher::{Dispatcher, Handler};
use crate::protocol::observer::{ConnectionObserver, NoopObserver};
use crate::transport::registry::SessionRegistry;
use crate::transport::session::Session;
use crate::transport::tcp;
use crate::utils::metrics::{Metrics, MetricsSnapshot};

/// State shared by the accept loop and every session worker
pub(crate) struct ServerInner {
    pub(crate) config: ServerConfig,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) observer: Arc<dyn ConnectionObserver>,
    pub(crate) registry: SessionRegistry,
    pub(crate) metrics: Arc<Metrics>,
}

/// Collects handlers, the observer and configuration for a [`Server`]
pub struct ServerBuilder {
    config: ServerConfig,
    dispatcher: Dispatcher,
    observer: Arc<dyn ConnectionObserver>,
    registry: SessionRegistry,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            dispatcher: Dispatcher::new(),
            observer: Arc::new(NoopObserver),
            registry: SessionRegistry::new(),
        }
    }

    /// Replace the server configuration
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Handle packets tagged `packet_type` with an async closure.
    ///
    /// Registering the same tag twice keeps the later handler.
    pub fn on<F, Fut>(mut self, packet_type: u8, handler: F) -> Self
    where
        F: Fn(Arc<Session>, Packet) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.dispatcher.register(packet_type, handler);
        self
    }

    /// Handle packets tagged `packet_type` with a [`Handler`] implementation
    pub fn handler<H: Handler>(mut self, packet_type: u8, handler: H) -> Self {
        self.dispatcher.register_handler(packet_type, handler);
        self
    }

    /// Install the lifecycle observer, replacing the no-op default
    pub fn observer<O: ConnectionObserver>(mut self, observer: O) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    /// Handle to the registry the built server will use.
    ///
    /// Lets handlers capture it for broadcasts before the server exists.
    pub fn registry(&self) -> SessionRegistry {
        self.registry.clone()
    }

    pub fn build(self) -> Server {
        info!(
            handlers = self.dispatcher.len(),
            max_connections = ?self.config.max_connections,
            "Server built"
        );
        Server {
            inner: Arc::new(ServerInner {
                config: self.config,
                dispatcher: self.dispatcher,
                observer: self.observer,
                registry: self.registry,
                metrics: Arc::new(Metrics::new()),
            }),
        }
    }
}

/// A packet server; cheap to clone, every clone drives the same state
#[derive(Clone)]
pub struct Server {
    inner: Arc<ServerInner>,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Builder preloaded with the server section of `config`
    pub fn from_config(config: &Config) -> ServerBuilder {
        ServerBuilder::new().config(config.server.clone())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Live sessions
    pub fn sessions(&self) -> &SessionRegistry {
        &self.inner.registry
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Bind `addr` and serve until Ctrl-C.
    ///
    /// Only a failed bind is reported as an error.
    #[instrument(skip(self))]
    pub async fn start(&self, addr: &str) -> Result<()> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

        let shutdown_tx_clone = shutdown_tx.clone();
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Received CTRL+C signal, shutting down");
                let _ = shutdown_tx_clone.send(()).await;
            }
        });

        let listener = TcpListener::bind(addr).await?;
        info!(address = %addr, "Listening");
        let served = self.serve_with_shutdown(listener, shutdown_rx).await;
        drop(shutdown_tx);
        served
    }

    /// Bind `addr` and serve until `shutdown_rx` receives a message
    #[instrument(skip(self, shutdown_rx))]
    pub async fn start_with_shutdown(
        &self,
        addr: &str,
        shutdown_rx: mpsc::Receiver<()>,
    ) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!(address = %addr, "Listening");
        self.serve_with_shutdown(listener, shutdown_rx).await
    }

    /// Serve an already bound listener forever
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let (_shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        self.serve_with_shutdown(listener, shutdown_rx).await
    }

    /// Serve an already bound listener until `shutdown_rx` receives a
    /// message or every sender is dropped.
    ///
    /// On shutdown every connection worker is cancelled, including ones still
    /// setting up, and the call returns once they have all finished or the
    /// configured shutdown timeout has passed.
    pub async fn serve_with_shutdown(
        &self,
        listener: TcpListener,
        shutdown_rx: mpsc::Receiver<()>,
    ) -> Result<()> {
        tcp::accept_loop(self.inner.clone(), listener, shutdown_rx).await
    }

    /// Send one packet to every live session, returning how many received all of it
    pub async fn broadcast<I>(&self, packet_type: u8, values: I) -> usize
    where
        I: IntoIterator<Item = Value>,
    {
        self.inner.registry.broadcast(packet_type, values).await
    }

    pub async fn broadcast_packet(&self, packet: &Packet) -> usize {
        self.inner.registry.broadcast_packet(packet).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::values;

    #[test]
    fn builder_collects_handlers() {
        let server = Server::builder()
            .on(1, |_, _| async {})
            .on(2, |_, _| async {})
            .on(1, |_, _| async {})
            .build();

        assert_eq!(server.inner.dispatcher.len(), 2);
        assert!(server.inner.dispatcher.contains(1));
        assert!(!server.inner.dispatcher.contains(3));
    }

    #[test]
    fn from_config_uses_server_section() {
        let mut config = Config::default();
        config.server.max_connections = Some(8);

        let server = Server::from_config(&config).build();
        assert_eq!(server.config().max_connections, Some(8));
    }

    #[tokio::test]
    async fn builder_registry_is_the_server_registry() {
        let builder = Server::builder();
        let registry = builder.registry();
        let server = builder.build();

        let peer = "127.0.0.1:5000".parse().unwrap();
        let session = Arc::new(Session::new(peer, tokio::io::sink(), Arc::new(Metrics::new())));
        registry.insert(session.clone()).await;

        assert_eq!(server.sessions().len().await, 1);
        assert_eq!(server.broadcast(7, values![1u8]).await, 1);
    }

    #[tokio::test]
    async fn dropped_shutdown_sender_stops_server() {
        let server = Server::builder().build();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = mpsc::channel::<()>(1);
        drop(tx);

        server.serve_with_shutdown(listener, rx).await.unwrap();
        assert_eq!(server.metrics().connections_total, 0);
    }
}
