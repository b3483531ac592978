//! Integration tests for stream framing with the packet codec
//!
//! These tests drive `PacketCodec` through `FramedRead`/`Framed` the way the
//! server and clients do, including reads that stop mid-packet.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use bytes::BytesMut;
use futures::{SinkExt, StreamExt};
use packet_server::{values, Packet, PacketCodec};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::codec::{Decoder, Encoder, Framed, FramedRead};

#[test]
fn test_codec_decode_zero_copy_split() {
    let mut codec = PacketCodec::new();
    let packet = Packet::with_values(1, values![1u8, 2u8, 3u8, 4u8, 5u8]).unwrap();

    let mut buffer = BytesMut::new();
    codec.encode(&packet, &mut buffer).unwrap();
    let original_capacity = buffer.capacity();

    let decoded = codec.decode(&mut buffer).expect("Failed to decode").unwrap();
    assert_eq!(decoded.payload(), &[1, 2, 3, 4, 5]);
    assert_eq!(buffer.len(), 0);
    assert!(buffer.capacity() <= original_capacity);
}

#[test]
fn test_codec_partial_prefix_preserves_buffer() {
    let mut codec = PacketCodec::new();
    let mut buffer = BytesMut::from(&[0x05][..]);

    let result = codec.decode(&mut buffer).expect("Decode should not error");
    assert!(result.is_none());
    assert_eq!(buffer.len(), 1);
}

#[test]
fn test_codec_encode_appends_after_existing_bytes() {
    let mut codec = PacketCodec::new();
    let mut buffer = BytesMut::from(&[9u8][..]);

    codec.encode(Packet::new(4), &mut buffer).unwrap();
    assert_eq!(&buffer[..], &[9, 3, 0, 4]);
}

#[tokio::test]
async fn test_framed_read_reassembles_across_writes() {
    let (mut tx, rx) = tokio::io::duplex(16);
    let mut frames = FramedRead::with_capacity(rx, PacketCodec::new(), 4);

    let writer = tokio::spawn(async move {
        // one packet split over three writes, a second in the same burst
        tx.write_all(&[9, 0]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        tx.write_all(&[8, b'a', 0, b'b']).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        tx.write_all(&[0, b'c', 0, 3, 0, 4]).await.unwrap();
    });

    let mut first = frames.next().await.unwrap().unwrap();
    assert_eq!(first.packet_type(), 8);
    assert_eq!(first.read::<String>().as_deref(), Some("a"));
    assert_eq!(first.read::<String>().as_deref(), Some("b"));
    assert_eq!(first.read::<String>().as_deref(), Some("c"));

    let second = frames.next().await.unwrap().unwrap();
    assert_eq!(second.packet_type(), 4);

    writer.await.unwrap();
    assert!(frames.next().await.is_none());
}

#[tokio::test]
async fn test_truncated_stream_ends_without_error() {
    let (mut tx, rx) = tokio::io::duplex(64);
    let mut frames = FramedRead::new(rx, PacketCodec::new());

    tx.write_all(&[3, 0, 1, 10, 0, 2]).await.unwrap();
    drop(tx);

    assert_eq!(frames.next().await.unwrap().unwrap().packet_type(), 1);
    assert!(frames.next().await.is_none());
}

#[tokio::test]
async fn test_framed_both_directions() {
    let (a, b) = tokio::io::duplex(256);
    let mut left = Framed::new(a, PacketCodec::new());
    let mut right = Framed::new(b, PacketCodec::new());

    left.send(Packet::with_values(149, values![1u8]).unwrap())
        .await
        .unwrap();
    let mut got = right.next().await.unwrap().unwrap();
    assert_eq!(got.packet_type(), 149);
    assert_eq!(got.read::<u8>(), Some(1));

    right.send(&Packet::new(4)).await.unwrap();
    assert_eq!(left.next().await.unwrap().unwrap().packet_type(), 4);
}
