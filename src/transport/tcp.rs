//! # TCP Transport
//!
//! Accept loop and per-connection dispatch worker.
//!
//! Every accepted connection gets its own task. The task registers a
//! [`Session`], runs the frame → dispatch loop until the peer goes away, and
//! then tears the session down exactly once, even if a handler panicked.
//!
//! ## Responsibilities
//! - Accept connections until shutdown, never aborting on a per-connection error
//! - Frame inbound bytes with [`PacketCodec`], retaining partial packets between reads
//! - Dispatch packets of one session strictly in arrival order
//! - Drain live sessions on graceful shutdown

use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, StreamExt};
use tokio::io::AsyncRead;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, FramedRead};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, instrument, trace, warn};

use super::session::Session;
use crate::core::codec::PacketCodec;
use crate::core::packet::{Packet, HEADER_SIZE};
use crate::error::{ProtocolError, Result};
use crate::protocol::dispatcher::Dispatch;
use crate::service::server::ServerInner;

/// Why a session's read loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionEnd {
    PeerClosed,
    ReadError,
    IdleTimeout,
    Closed,
    Shutdown,
    Panicked,
}

/// Accept connections until `shutdown_rx` fires (or its sender is dropped)
#[instrument(skip_all, fields(address = %listener.local_addr().map(|a| a.to_string()).unwrap_or_default()))]
pub(crate) async fn accept_loop(
    inner: Arc<ServerInner>,
    listener: TcpListener,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> Result<()> {
    info!("Accepting connections");

    let workers = TaskTracker::new();
    let shutdown = CancellationToken::new();

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("Shutting down server. Waiting for sessions to close...");
                drain(&inner, &workers, &shutdown).await;
                inner.metrics.log_metrics();
                return Ok(());
            }

            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer)) => {
                        if at_capacity(&inner) {
                            warn!(%peer, "Connection limit reached, closing connection");
                            inner.metrics.connection_rejected();
                            drop(stream);
                            continue;
                        }

                        // counted here so a burst of accepts cannot overshoot the cap
                        inner.metrics.connection_established();
                        workers.spawn(handle_connection(
                            inner.clone(),
                            stream,
                            peer,
                            shutdown.child_token(),
                        ));
                    }
                    Err(e) => {
                        error!(error = %e, "Error accepting connection");
                    }
                }
            }
        }
    }
}

fn at_capacity(inner: &ServerInner) -> bool {
    match inner.config.max_connections {
        Some(max) => inner.metrics.connections_active.load(Ordering::Relaxed) >= max as u64,
        None => false,
    }
}

/// Cancel every worker, including ones not yet registered, and wait up to the
/// shutdown timeout for all of them to finish
async fn drain(inner: &ServerInner, workers: &TaskTracker, shutdown: &CancellationToken) {
    shutdown.cancel();
    workers.close();
    debug!(workers = workers.len(), "Waiting for session workers");

    match tokio::time::timeout(inner.config.shutdown_timeout, workers.wait()).await {
        Ok(()) => info!("All sessions closed, shutting down"),
        Err(_) => warn!(
            workers = workers.len(),
            "Shutdown timeout reached, forcing exit"
        ),
    }
}

async fn handle_connection(
    inner: Arc<ServerInner>,
    stream: TcpStream,
    peer: SocketAddr,
    shutdown: CancellationToken,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(%peer, error = %e, "Failed to set TCP_NODELAY");
    }
    let (read_half, write_half) = stream.into_split();
    let session = Arc::new(Session::new(peer, write_half, inner.metrics.clone()));
    run_session(inner, session, read_half, shutdown).await;
}

/// Full lifecycle of one session: register, serve, clean up.
///
/// The caller has already counted the connection in the metrics. Cancelling
/// `shutdown` ends the session even if it is cancelled before registration.
#[instrument(skip_all, fields(session = %session.id(), peer = %session.peer_addr()))]
pub(crate) async fn run_session<R>(
    inner: Arc<ServerInner>,
    session: Arc<Session>,
    reader: R,
    shutdown: CancellationToken,
) -> SessionEnd
where
    R: AsyncRead + Send + Unpin,
{
    inner.registry.insert(session.clone()).await;
    info!("Session connected");

    let served = AssertUnwindSafe(async {
        inner.observer.on_connect(&session).await;
        dispatch_loop(&inner, &session, reader, &shutdown).await
    })
    .catch_unwind()
    .await;

    let end = served.unwrap_or_else(|_| {
        error!("Session worker panicked");
        SessionEnd::Panicked
    });

    if AssertUnwindSafe(inner.observer.on_disconnect(&session))
        .catch_unwind()
        .await
        .is_err()
    {
        error!("Disconnect hook panicked");
    }
    inner.registry.remove(&session.id()).await;
    session.shutdown().await;
    inner.metrics.connection_closed();

    info!(reason = ?end, "Session disconnected");
    end
}

async fn dispatch_loop<R>(
    inner: &ServerInner,
    session: &Arc<Session>,
    reader: R,
    shutdown: &CancellationToken,
) -> SessionEnd
where
    R: AsyncRead + Send + Unpin,
{
    let codec = PacketCodec::with_max_frame_len(inner.config.max_packet_size);
    let mut frames = FramedRead::with_capacity(reader, codec, inner.config.read_buffer_size);

    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => return SessionEnd::Shutdown,
            _ = session.closed() => return SessionEnd::Closed,
            next = next_frame(&mut frames, inner.config.idle_timeout) => next,
        };

        let packet = match next {
            Ok(Some(Ok(packet))) => packet,
            Ok(Some(Err(e))) => {
                debug!(error = %e, "Read failed");
                return SessionEnd::ReadError;
            }
            Ok(None) => return SessionEnd::PeerClosed,
            Err(_) => return SessionEnd::IdleTimeout,
        };

        inner
            .metrics
            .packet_received((HEADER_SIZE + packet.remaining()) as u64);
        trace!(packet_type = packet.packet_type(), size = packet.size(), "Packet received");

        let outcome = inner
            .dispatcher
            .dispatch(session, packet, inner.observer.as_ref())
            .await;
        if outcome == Dispatch::Unknown {
            inner.metrics.unknown_packet();
        }
    }
}

async fn next_frame<R>(
    frames: &mut FramedRead<R, PacketCodec>,
    idle_timeout: Option<Duration>,
) -> Result<Option<Result<Packet>>>
where
    R: AsyncRead + Unpin,
{
    match idle_timeout {
        Some(limit) => tokio::time::timeout(limit, frames.next())
            .await
            .map_err(|_| ProtocolError::Timeout),
        None => Ok(frames.next().await),
    }
}

/// Connect to a packet server, framing the stream with [`PacketCodec`]
#[instrument(fields(address = %addr))]
pub async fn connect(addr: &str) -> Result<Framed<TcpStream, PacketCodec>> {
    let stream = TcpStream::connect(addr).await?;
    Ok(Framed::new(stream, PacketCodec::new()))
}
