//! Codec benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use tick_proto::{decode, encode, InstrumentType, Side, TickRecord};

fn bench_encode_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_codec");
    group.throughput(Throughput::Elements(1));

    let tick = TickRecord::new(12345, InstrumentType::Option, Side::Buy, 100.5, 1.0);
    let bytes = encode(&tick);

    group.bench_function("encode", |b| {
        b.iter(|| black_box(encode(black_box(&tick))))
    });

    group.bench_function("decode", |b| {
        b.iter(|| black_box(decode(black_box(&bytes))))
    });

    group.finish();
}

criterion_group!(benches, bench_encode_decode);
criterion_main!(benches);
