//! Benchmarks for the packet codec hot path

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};

use downlink_protocol::{
    PrimaryHeader, SecondaryHeader, TelemetryPayload, TelemetryRecord, decode, encode,
};

fn sample_record() -> TelemetryRecord {
    TelemetryRecord::new(
        PrimaryHeader::new(0, 0, true, 1, 0b11, 1234),
        SecondaryHeader {
            timestamp: 1_700_000_000,
            subsystem_id: 1,
        },
        TelemetryPayload {
            temperature: 25.0,
            battery: 88.0,
            altitude: 520.0,
            signal: -50.0,
        },
    )
}

fn bench_encode(c: &mut Criterion) {
    let record = sample_record();

    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Elements(1));
    group.bench_function("encode", |b| b.iter(|| black_box(encode(black_box(&record)))));
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let bytes = encode(&sample_record());

    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Elements(1));
    group.bench_function("decode", |b| b.iter(|| black_box(decode(black_box(&bytes)))));
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
