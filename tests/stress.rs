use bytes::BytesMut;
use packet_server::{values, Framer, Packet, PacketCodec, Value};
use tokio_util::codec::Encoder;

#[test]
#[allow(clippy::unwrap_used)]
fn stress_packet_build_frame_large_series() {
    // heavy burst of packets through one framer, fed in awkward chunk sizes
    let mut codec = PacketCodec::new();
    let mut wire = BytesMut::new();
    let mut expected = 0usize;

    for size in [0usize, 1, 64, 512, 4096, 65_000] {
        for i in 0..200u32 {
            let mut packet = Packet::new((i % 256) as u8);
            packet.write_values(&vec![Value::U8(0xA5); size]).unwrap();
            codec.encode(packet, &mut wire).unwrap();
            expected += 1;
        }
    }

    let mut framer = Framer::new();
    let mut decoded = 0usize;
    for chunk in wire.chunks(1021) {
        for packet in framer.push(chunk) {
            assert!(packet.payload().iter().all(|&b| b == 0xA5));
            decoded += 1;
        }
    }
    assert_eq!(decoded, expected);
    assert_eq!(framer.pending(), 0);
}

#[test]
#[allow(clippy::unwrap_used)]
fn stress_read_many_small_fields() {
    let mut packet = Packet::new(1);
    for i in 0..10_000u32 {
        packet.write(i as u16).unwrap();
    }
    packet.write_values(&values!["end"]).unwrap();

    for i in 0..10_000u32 {
        assert_eq!(packet.read::<u16>(), Some(i as u16));
    }
    assert_eq!(packet.read::<String>().as_deref(), Some("end"));
    assert!(packet.is_exhausted());
}
