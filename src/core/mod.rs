//! # Core Protocol Components
//!
//! Low-level packet handling, field encoding and stream framing.
//!
//! ## Components
//! - **Field**: closed set of little-endian field kinds and the `Value` type
//! - **Packet**: length-prefixed, type-tagged buffer with typed append/consume
//! - **Codec**: Tokio codec and chunk framer that split a byte stream into packets
//!
//! ## Wire Format
//! ```text
//! [TotalSize(2, LE)] [Type(1)] [Payload(TotalSize - 3)]
//! ```
//!
//! ## Limits
//! - Maximum packet size: 65535 bytes (16-bit length prefix)
//! - Frames shorter than the 3-byte header are never dispatched

pub mod codec;
pub mod field;
pub mod packet;
