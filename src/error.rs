//! # Error Types
//!
//! Error handling for the packet server.
//!
//! Most runtime conditions on the wire are *not* errors: short
//! frames are dropped, unknown type tags go to the observer, and read failures
//! simply end a session. The variants below cover what a caller can actually
//! act on.
//!
//! ## Error Categories
//! - **I/O Errors**: bind and socket failures
//! - **Packet Errors**: too-short frames, oversized packets, unencodable fields
//! - **Configuration Errors**: invalid or unreadable settings
//!
//! ## Example Usage
//! ```rust
//! use packet_server::core::packet::Packet;
//! use packet_server::error::{ProtocolError, Result};
//!
//! fn wrap(raw: &[u8]) -> Result<u8> {
//!     let packet = Packet::from_bytes(raw)?;
//!     Ok(packet.packet_type())
//! }
//!
//! assert!(matches!(wrap(&[1, 0]), Err(ProtocolError::InvalidPacket)));
//! assert_eq!(wrap(&[3, 0, 9]).ok(), Some(9));
//! ```

use std::io;
use thiserror::Error;

// ProtocolError is the primary error type for all server operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid packet structure: shorter than the 3-byte header")]
    InvalidPacket,

    #[error("Packet too large: {0} bytes")]
    OversizedPacket(usize),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timeout occurred")]
    Timeout,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
