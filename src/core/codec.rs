//! # Packet Codec
//!
//! Splits a raw byte stream into [`Packet`]s using the 2-byte length prefix
//! every packet carries, and writes packets back out.
//!
//! Bytes that do not yet form a whole packet stay in the read buffer until the
//! next read, so packets straddling two socket reads are reassembled rather
//! than mis-framed.
//!
//! ## Framing rules
//! - A declared length of 0 is treated as 1
//! - A declared length above `max_frame_len` is clamped to it
//! - Frames shorter than the 3-byte header are dropped
//! - A partial frame left over at end of stream is dropped

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use super::packet::{Packet, HEADER_SIZE, MAX_PACKET_SIZE};
use crate::error::{ProtocolError, Result};

/// Size of the length prefix at the start of every packet
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Tokio codec for length-prefixed packets
#[derive(Debug, Clone, Copy)]
pub struct PacketCodec {
    max_frame_len: usize,
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketCodec {
    pub fn new() -> Self {
        Self {
            max_frame_len: MAX_PACKET_SIZE,
        }
    }

    /// Codec that never slices a frame longer than `max_frame_len`.
    ///
    /// The bound is kept within `HEADER_SIZE..=MAX_PACKET_SIZE`.
    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self {
            max_frame_len: max_frame_len.clamp(HEADER_SIZE, MAX_PACKET_SIZE),
        }
    }

    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    /// Length of the next frame candidate, after the 0 → 1 and clamp rules
    #[inline]
    fn frame_len(&self, prefix: [u8; LENGTH_PREFIX_SIZE]) -> usize {
        let declared = u16::from_le_bytes(prefix) as usize;
        declared.max(1).min(self.max_frame_len)
    }
}

impl Decoder for PacketCodec {
    type Item = Packet;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Packet>> {
        loop {
            if src.len() < LENGTH_PREFIX_SIZE {
                return Ok(None);
            }

            let len = self.frame_len([src[0], src[1]]);

            if len < HEADER_SIZE {
                trace!(len, "Dropping frame shorter than header");
                src.advance(len);
                continue;
            }

            if src.len() < len {
                src.reserve(len - src.len());
                return Ok(None);
            }

            let mut frame = src.split_to(len);
            let declared = u16::from_le_bytes([frame[0], frame[1]]) as usize;
            if declared != len {
                // clamped: the size field must describe the bytes actually framed
                trace!(declared, len, "Rewriting clamped frame length");
                frame[..LENGTH_PREFIX_SIZE].copy_from_slice(&(len as u16).to_le_bytes());
            }
            return Packet::from_frame(frame).map(Some);
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Packet>> {
        match self.decode(src)? {
            Some(packet) => Ok(Some(packet)),
            None => {
                if !src.is_empty() {
                    trace!(bytes = src.len(), "Dropping partial frame at end of stream");
                    src.clear();
                }
                Ok(None)
            }
        }
    }
}

impl Encoder<Packet> for PacketCodec {
    type Error = ProtocolError;

    fn encode(&mut self, packet: Packet, dst: &mut BytesMut) -> Result<()> {
        packet.encode_into(dst);
        Ok(())
    }
}

impl<'a> Encoder<&'a Packet> for PacketCodec {
    type Error = ProtocolError;

    fn encode(&mut self, packet: &'a Packet, dst: &mut BytesMut) -> Result<()> {
        packet.encode_into(dst);
        Ok(())
    }
}

/// Chunk-oriented framer.
///
/// Feed it bytes as they arrive and collect the packets that became complete.
/// Trailing bytes of an unfinished packet are carried over to the next push.
#[derive(Debug, Default)]
pub struct Framer {
    buffer: BytesMut,
    codec: PacketCodec,
}

impl Framer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_codec(codec: PacketCodec) -> Self {
        Self {
            buffer: BytesMut::new(),
            codec,
        }
    }

    /// Append `chunk` and drain every complete packet, in stream order
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Packet> {
        self.buffer.extend_from_slice(chunk);

        let mut packets = Vec::new();
        // decode() only fails on frames it already length-checked
        while let Ok(Some(packet)) = self.codec.decode(&mut self.buffer) {
            packets.push(packet);
        }
        packets
    }

    /// Bytes held back waiting for the rest of a packet
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partially received packet
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}
