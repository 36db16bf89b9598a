//! Throughput benchmarks for wirecodec
//!
//! Measures bytes per second for each codec:
//! - Standalone encode through the scratch pool
//! - Zero-copy encode into a reused network buffer
//! - Decode from a byte slice
//! - Frame encode plus decode

use bytes::BytesMut;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use wirecodec::envelope::InvokeId;
use wirecodec::framing::{FrameHeader, HEADER_LEN, encode_frame};
use wirecodec::{Codec, CodecConfig, CodecRegistry, CycleSafeTypes};

/// Representative call payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Order {
    id: u64,
    customer: String,
    items: Vec<Item>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Item {
    sku: String,
    quantity: u32,
    price_cents: i64,
}

impl Order {
    fn with_items(count: usize) -> Self {
        Self {
            id: 42,
            customer: "customer-0001".to_string(),
            items: (0..count)
                .map(|i| Item {
                    sku: format!("SKU-{i:06}"),
                    quantity: (i % 7) as u32 + 1,
                    price_cents: 1_999,
                })
                .collect(),
        }
    }
}

fn registry() -> CodecRegistry {
    CodecRegistry::standard(&CodecConfig::default(), CycleSafeTypes::new())
}

fn bench_encode(c: &mut Criterion) {
    let registry = registry();
    let mut group = c.benchmark_group("encode");
    group.measurement_time(Duration::from_secs(5));

    for items in [1usize, 32, 1024] {
        let order = Order::with_items(items);
        for codec in registry.iter() {
            let size = codec.encode(&order).map_or(0, |bytes| bytes.len());
            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(BenchmarkId::new(codec.name(), items), &order, |b, order| {
                b.iter(|| codec.encode(black_box(order)))
            });
        }
    }

    group.finish();
}

fn bench_encode_into(c: &mut Criterion) {
    let registry = registry();
    let mut group = c.benchmark_group("encode_into");
    group.measurement_time(Duration::from_secs(5));

    let order = Order::with_items(32);
    for codec in registry.iter() {
        let mut sink = BytesMut::with_capacity(64 * 1024);
        group.bench_function(codec.name(), |b| {
            b.iter(|| {
                sink.clear();
                codec.encode_into(&mut sink, black_box(&order)).map(|sink| sink.len())
            })
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let registry = registry();
    let mut group = c.benchmark_group("decode");
    group.measurement_time(Duration::from_secs(5));

    for items in [1usize, 32, 1024] {
        let order = Order::with_items(items);
        for codec in registry.iter() {
            let Ok(bytes) = codec.encode(&order) else {
                continue;
            };
            group.throughput(Throughput::Bytes(bytes.len() as u64));
            group.bench_with_input(BenchmarkId::new(codec.name(), items), &bytes, |b, bytes| {
                b.iter(|| codec.decode_slice::<Order>(black_box(bytes)))
            });
        }
    }

    group.finish();
}

fn bench_frame(c: &mut Criterion) {
    let registry = registry();
    let mut group = c.benchmark_group("frame");
    group.throughput(Throughput::Elements(1));

    let order = Order::with_items(32);
    for codec in registry.iter() {
        let mut wire = BytesMut::with_capacity(64 * 1024);
        group.bench_function(codec.name(), |b| {
            b.iter(|| {
                wire.clear();
                encode_frame(&mut wire, FrameHeader::request(InvokeId::from(1)), codec, &order)
                    .ok()?;
                codec.decode_slice::<Order>(&wire[HEADER_LEN..]).ok()
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_encode,
    bench_encode_into,
    bench_decode,
    bench_frame
);
criterion_main!(benches);
