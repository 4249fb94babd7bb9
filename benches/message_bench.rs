//! Performance benchmarks for authority message encoding and decoding.
//!
//! Every inbound frame is decoded on the control loop, so decoding latency
//! adds directly to relay and presence timer jitter.
//!
//! Run benchmarks with:
//! ```sh
//! cargo bench --bench message_bench
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use makerpass_core::CardCode;
use makerpass_protocol::{MessageParser, Outbound};
use std::hint::black_box;

const INBOUND_SAMPLES: &[(&str, &str)] = &[
    ("ping", r#"{"type":"ping"}"#),
    (
        "access_granted",
        r#"{"type":"access_granted","user_name":"Alice Example"}"#,
    ),
    (
        "session_started",
        concat!(
            r#"{"type":"session_started","#,
            r#""session_id":"6f1c2a9e-33b1-4d2c-9a51-0c7e5b8d2f10","user":"Alice"}"#,
        ),
    ),
    (
        "auth_success",
        concat!(
            r#"{"type":"auth_success","enabled":true,"#,
            r#""require_card_present":true,"resource_name":"Laser Cutter"}"#,
        ),
    ),
];

/// Benchmark decoding each inbound message kind.
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_inbound");
    group.throughput(Throughput::Elements(1));

    for (name, text) in INBOUND_SAMPLES {
        group.bench_with_input(BenchmarkId::from_parameter(name), text, |b, text| {
            b.iter(|| black_box(MessageParser::parse(black_box(text)).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark encoding the scan message sent on every card read.
fn bench_encode_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_outbound");
    group.throughput(Throughput::Elements(1));

    let msg = Outbound::RfidScan {
        resource_id: "ERNPTY".into(),
        rfid_code: CardCode::from_wiegand(0x00AB_12CD),
    };

    group.bench_function("rfid_scan", |b| {
        b.iter(|| black_box(black_box(&msg).to_json().unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_decode, bench_encode_scan);
criterion_main!(benches);
