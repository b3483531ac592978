//! # Packet
//!
//! In-memory representation of one length-prefixed, type-tagged message.
//!
//! ## Wire Format
//! ```text
//! [TotalSize(2, LE)] [Type(1)] [Payload(TotalSize - 3)]
//! ```
//!
//! `TotalSize` counts the header itself, so an empty packet is exactly
//! `[3, 0, type]`. Writes append typed fields to the payload; reads consume
//! them destructively from the front, shrinking `TotalSize` as they go.
//!
//! ## Example
//! ```rust
//! use packet_server::core::packet::Packet;
//!
//! let mut packet = Packet::new(8);
//! packet.write("kal").unwrap().write(7u16).unwrap();
//! assert_eq!(packet.size(), 9);
//!
//! assert_eq!(packet.read::<String>().as_deref(), Some("kal"));
//! assert_eq!(packet.read::<u16>(), Some(7));
//! assert_eq!(packet.size(), 3);
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::borrow::Cow;
use std::fmt;

use super::field::{Field, FieldKind, Value};
use crate::error::{ProtocolError, Result};

/// Size of the fixed header: 2-byte length + 1-byte type tag
pub const HEADER_SIZE: usize = 3;

/// Largest total size the 16-bit length prefix can describe
pub const MAX_PACKET_SIZE: usize = u16::MAX as usize;

/// A single binary packet, exclusively owned by whoever is processing it
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    header: [u8; HEADER_SIZE],
    payload: BytesMut,
}

impl Packet {
    /// Create an empty packet carrying only a type tag
    pub fn new(packet_type: u8) -> Self {
        Self {
            header: [HEADER_SIZE as u8, 0, packet_type],
            payload: BytesMut::new(),
        }
    }

    /// Create a packet and append every value in order
    pub fn with_values<I>(packet_type: u8, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut packet = Self::new(packet_type);
        for value in values {
            packet.write_value(&value)?;
        }
        Ok(packet)
    }

    /// Wrap raw bytes taken off the wire.
    ///
    /// The length prefix is adopted as-is; the caller is responsible for having
    /// sliced exactly one packet.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_frame(BytesMut::from(data))
    }

    /// Zero-copy variant of [`Packet::from_bytes`] for frames split off a read buffer
    pub fn from_frame(mut frame: BytesMut) -> Result<Self> {
        if frame.len() < HEADER_SIZE {
            return Err(ProtocolError::InvalidPacket);
        }
        let mut header = [0u8; HEADER_SIZE];
        header.copy_from_slice(&frame[..HEADER_SIZE]);
        frame.advance(HEADER_SIZE);
        Ok(Self {
            header,
            payload: frame,
        })
    }

    /// Type tag (byte 2)
    #[inline]
    pub fn packet_type(&self) -> u8 {
        self.header[2]
    }

    /// Total size as recorded in the length prefix, header included
    #[inline]
    pub fn size(&self) -> u16 {
        u16::from_le_bytes([self.header[0], self.header[1]])
    }

    #[inline]
    fn set_size(&mut self, size: u16) {
        self.header[..2].copy_from_slice(&size.to_le_bytes());
    }

    /// Unread payload bytes
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Number of unread payload bytes
    #[inline]
    pub fn remaining(&self) -> usize {
        self.payload.len()
    }

    /// True once the size field is down to the bare header or every payload
    /// byte has been consumed; reads stop at either
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.size() as usize <= HEADER_SIZE || self.payload.is_empty()
    }

    /// Payload rendered as text, invalid UTF-8 replaced
    pub fn payload_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }

    /// Contiguous wire bytes: header followed by the unread payload
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + self.payload.len());
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Append the wire bytes of this packet to `dst`
    pub fn encode_into(&self, dst: &mut BytesMut) {
        dst.reserve(HEADER_SIZE + self.payload.len());
        dst.put_slice(&self.header);
        dst.put_slice(&self.payload);
    }

    // ------------------------------------------------------------------
    // Writing
    // ------------------------------------------------------------------

    /// Append one typed field.
    ///
    /// Fails without modifying the packet if the field cannot be encoded or
    /// the packet would outgrow the 16-bit length prefix.
    pub fn write(&mut self, value: impl Into<Value>) -> Result<&mut Self> {
        self.write_value(&value.into())
    }

    /// Append one dynamically typed field
    pub fn write_value(&mut self, value: &Value) -> Result<&mut Self> {
        let new_size = self.grown_size(value.encoded_len())?;
        value.encode(&mut self.payload)?;
        self.set_size(new_size);
        Ok(self)
    }

    /// Append several fields in order, stopping at the first failure
    pub fn write_values<'a, I>(&mut self, values: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        for value in values {
            self.write_value(value)?;
        }
        Ok(self)
    }

    fn grown_size(&self, extra: usize) -> Result<u16> {
        let total = self.size() as usize + extra;
        u16::try_from(total).map_err(|_| ProtocolError::OversizedPacket(total))
    }

    // ------------------------------------------------------------------
    // Reading
    // ------------------------------------------------------------------

    /// Consume one typed field from the front of the payload.
    ///
    /// Returns `None` without consuming anything when the payload is
    /// exhausted or a fixed-width field does not fit. A string read with no
    /// terminator left in the payload yields an empty string and consumes
    /// nothing.
    pub fn read<F: Field>(&mut self) -> Option<F> {
        self.read_counted().map(|(value, _)| value)
    }

    fn read_counted<F: Field>(&mut self) -> Option<(F, usize)> {
        if self.is_exhausted() {
            return None;
        }
        let (value, consumed) = F::decode(&self.payload)?;
        self.consume(consumed);
        Some((value, consumed))
    }

    /// Consume one field into `dst`, leaving `dst` untouched on a skipped read.
    ///
    /// A read that consumes nothing (a string with no terminator left) counts
    /// as skipped. Returns whether `dst` was written.
    pub fn read_into<F: Field>(&mut self, dst: &mut F) -> bool {
        match self.read_counted::<F>() {
            Some((value, consumed)) if consumed > 0 => {
                *dst = value;
                true
            }
            _ => false,
        }
    }

    /// Consume one field of a kind chosen at runtime
    pub fn read_kind(&mut self, kind: FieldKind) -> Option<Value> {
        if self.is_exhausted() {
            return None;
        }
        let (value, consumed) = kind.decode(&self.payload)?;
        self.consume(consumed);
        Some(value)
    }

    /// Consume fields following a message schema.
    ///
    /// The result has one slot per requested kind. A slot is `None` when that
    /// field was skipped for lack of bytes, and every slot after the payload
    /// runs out is `None` as well.
    pub fn read_schema(&mut self, schema: &[FieldKind]) -> Vec<Option<Value>> {
        let mut out = Vec::with_capacity(schema.len());
        for &kind in schema {
            if self.is_exhausted() {
                break;
            }
            out.push(self.read_kind(kind));
        }
        out.resize(schema.len(), None);
        out
    }

    fn consume(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        self.payload.advance(n);
        let n = u16::try_from(n).unwrap_or(u16::MAX);
        let size = self.size().saturating_sub(n);
        self.set_size(size.max(HEADER_SIZE as u16));
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("type", &self.packet_type())
            .field("size", &self.size())
            .field("payload", &&self.payload[..])
            .finish()
    }
}

/// Raw bytes, space separated: `[5 0 1 3 7]`
impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, b) in self.header.iter().chain(self.payload.iter()).enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{b}")?;
        }
        f.write_str("]")
    }
}
