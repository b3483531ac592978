use bytes::BytesMut;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use packet_server::{core::codec::PacketCodec, values, FieldKind, Framer, Packet};
use tokio_util::codec::{Decoder, Encoder};

#[allow(clippy::unwrap_used)]
fn login_packet() -> Packet {
    Packet::with_values(8, values!["player-one", "hunter2", "00:1A:2B:3C:4D:5E"]).unwrap()
}

#[allow(clippy::unwrap_used)]
fn bench_packet_build_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("packet_build_read");

    group.bench_function("build_player_info", |b| {
        b.iter(|| {
            let mut packet = Packet::new(114);
            packet
                .write_values(&values![0u8, 0u8, 0i32, 1u8, 1i32, "Liplay", 4u8, 11u8, 60u8, 0i32])
                .unwrap();
            for _ in 0..5 {
                packet.write(5u16).unwrap();
            }
            packet
        })
    });

    group.bench_function("read_login_schema", |b| {
        let packet = login_packet();
        b.iter_batched(
            || packet.clone(),
            |mut p| p.read_schema(&[FieldKind::Str, FieldKind::Str, FieldKind::Str]),
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

#[allow(clippy::unwrap_used)]
fn bench_framing(c: &mut Criterion) {
    let mut group = c.benchmark_group("framing");
    let payload_sizes = [16usize, 256, 4096, 65_000];

    for &size in &payload_sizes {
        let mut packet = Packet::new(1);
        packet.write_values(&vec![packet_server::Value::U8(7); size]).unwrap();
        let mut wire = BytesMut::new();
        PacketCodec::new().encode(&packet, &mut wire).unwrap();

        group.throughput(Throughput::Bytes(wire.len() as u64));
        group.bench_function(format!("decode_{size}b"), |b| {
            b.iter_batched(
                || wire.clone(),
                |mut buf| PacketCodec::new().decode(&mut buf).unwrap(),
                BatchSize::SmallInput,
            )
        });
        group.bench_function(format!("framer_1k_chunks_{size}b"), |b| {
            b.iter(|| {
                let mut framer = Framer::new();
                let mut frames = 0;
                for chunk in wire.chunks(1024) {
                    frames += framer.push(chunk).len();
                }
                assert_eq!(frames, 1);
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_packet_build_read, bench_framing);
criterion_main!(benches);
