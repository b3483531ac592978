#![no_main]

use libfuzzer_sys::fuzz_target;
use packet_server::{FieldKind, Framer};

const SCHEMA: [FieldKind; 6] = [
    FieldKind::U8,
    FieldKind::Str,
    FieldKind::I32,
    FieldKind::U16,
    FieldKind::F64,
    FieldKind::Str,
];

fuzz_target!(|data: &[u8]| {
    // Frame arbitrary bytes in uneven chunks and read every packet dry
    let mut framer = Framer::new();
    for chunk in data.chunks(7) {
        for mut packet in framer.push(chunk) {
            let before = packet.remaining();
            let _ = packet.read_schema(&SCHEMA);
            assert!(packet.remaining() <= before);
            assert_eq!(packet.size() as usize, packet.remaining() + 3);
        }
    }
});
