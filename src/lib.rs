//! # Packet Server
//!
//! A TCP server for small binary game protocols.
//!
//! Clients exchange length-prefixed packets:
//!
//! ```text
//! [Size(2, LE)] [Type(1)] [Payload(Size - 3)]
//! ```
//!
//! The size covers the whole packet including itself. Payload fields are
//! little-endian fixed-width integers and floats, and NUL-terminated strings.
//!
//! ## Layers
//! - [`core`]: packet building and reading, and the stream framer
//! - [`protocol`]: type-tag dispatch and connection lifecycle hooks
//! - [`transport`]: sessions, the session registry and the TCP accept loop
//! - [`service`]: the [`Server`] and its builder
//!
//! ## Example
//! ```no_run
//! use packet_server::{values, FieldKind, Server};
//!
//! #[tokio::main]
//! async fn main() -> packet_server::Result<()> {
//!     let server = Server::builder()
//!         .on(8, |session, mut packet| async move {
//!             let login = packet.read_schema(&[FieldKind::Str, FieldKind::Str]);
//!             tracing::info!(?login, "Login");
//!             session.send(149, values![1u8]).await;
//!         })
//!         .build();
//!
//!     server.start("0.0.0.0:30001").await
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod utils;

pub use crate::core::codec::{Framer, PacketCodec};
pub use crate::core::field::{Field, FieldKind, Value};
pub use crate::core::packet::Packet;
pub use crate::error::{ProtocolError, Result};
pub use crate::protocol::dispatcher::{Dispatch, Dispatcher, Handler};
pub use crate::protocol::observer::{ConnectionObserver, NoopObserver};
pub use crate::service::server::{Server, ServerBuilder};
pub use crate::transport::registry::SessionRegistry;
pub use crate::transport::session::{Session, SessionId};
