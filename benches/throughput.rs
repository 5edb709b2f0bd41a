//! Throughput Benchmark for kvcache
//!
//! This benchmark measures the sharded cache and the wire codecs under
//! various workloads.

use bytes::{Bytes, BytesMut};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use kvcache::protocol::{Codec, Protocol, Reply};
use kvcache::storage::{fnv1a_32, ShardedCache};
use std::sync::Arc;
use std::time::Duration;

/// Benchmark PUT operations
fn bench_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("put");
    group.throughput(Throughput::Elements(1));

    group.bench_function("put_insert_evicting", |b| {
        // Small shards so every new key evicts after warm-up
        let cache = ShardedCache::new(16, 1_000).unwrap();
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            cache.put(key, Bytes::from_static(b"small_value"));
            i += 1;
        });
    });

    group.bench_function("put_update", |b| {
        let cache = ShardedCache::new(16, 20_000).unwrap();
        let value = Bytes::from("x".repeat(256));
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i % 1_000));
            cache.put(key, value.clone());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark GET operations
fn bench_get(c: &mut Criterion) {
    let cache = ShardedCache::new(16, 20_000).unwrap();

    // Pre-populate with data
    for i in 0..100_000 {
        let key = Bytes::from(format!("key:{}", i));
        let value = Bytes::from(format!("value:{}", i));
        cache.put(key, value);
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i % 100_000);
            black_box(cache.get(key.as_bytes()));
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("missing:{}", i);
            black_box(cache.get(key.as_bytes()));
            i += 1;
        });
    });

    group.bench_function("fnv1a_32", |b| {
        b.iter(|| black_box(fnv1a_32(black_box(b"user:1234567890"))));
    });

    group.finish();
}

/// Benchmark mixed workload (80% reads, 20% writes)
fn bench_mixed(c: &mut Criterion) {
    let cache = ShardedCache::new(16, 1_000).unwrap();

    // Pre-populate
    for i in 0..10_000 {
        let key = Bytes::from(format!("key:{}", i));
        let value = Bytes::from(format!("value:{}", i));
        cache.put(key, value);
    }

    let mut group = c.benchmark_group("mixed");
    group.throughput(Throughput::Elements(1));

    group.bench_function("80_read_20_write", |b| {
        let mut i = 0u64;
        b.iter(|| {
            if i % 5 == 0 {
                // 20% writes
                let key = Bytes::from(format!("new:{}", i));
                cache.put(key, Bytes::from_static(b"value"));
            } else {
                // 80% reads
                let key = format!("key:{}", i % 10_000);
                black_box(cache.get(key.as_bytes()));
            }
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark concurrent access
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_mixed", |b| {
        b.iter(|| {
            let cache = Arc::new(ShardedCache::new(16, 5_000).unwrap());
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let cache = Arc::clone(&cache);
                    thread::spawn(move || {
                        for i in 0..10_000 {
                            let key = Bytes::from(format!("key:{}:{}", t, i));
                            cache.put(key.clone(), Bytes::from_static(b"value"));
                            cache.get(&key);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(cache.len());
        });
    });

    group.finish();
}

/// Benchmark decoding and encoding a pipelined batch
fn bench_codecs(c: &mut Criterion) {
    let mut line_batch = BytesMut::new();
    let mut resp_batch = BytesMut::new();
    for i in 0..100 {
        line_batch.extend_from_slice(format!("PUT key:{} value:{}\n", i, i).as_bytes());
        let key = format!("key:{}", i);
        let value = format!("value:{}", i);
        resp_batch.extend_from_slice(
            format!(
                "*3\r\n$3\r\nSET\r\n${}\r\n{}\r\n${}\r\n{}\r\n",
                key.len(),
                key,
                value.len(),
                value
            )
            .as_bytes(),
        );
    }

    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Elements(100));

    for (name, protocol, batch) in [
        ("line_decode_100", Protocol::Line, line_batch),
        ("resp_decode_100", Protocol::Resp, resp_batch),
    ] {
        group.bench_function(name, |b| {
            let mut codec = Codec::new(protocol, 64 * 1024);
            b.iter(|| {
                let mut buf = batch.clone();
                while let Ok(Some(request)) = codec.decode(&mut buf) {
                    black_box(request);
                }
            });
        });
    }

    group.bench_function("resp_encode_100", |b| {
        let codec = Codec::new(Protocol::Resp, 64 * 1024);
        let reply = Reply::Value(Bytes::from("x".repeat(64)));
        let mut out = BytesMut::with_capacity(8 * 1024);
        b.iter(|| {
            out.clear();
            for _ in 0..100 {
                codec.encode(&reply, &mut out);
            }
            black_box(out.len());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_put,
    bench_get,
    bench_mixed,
    bench_concurrent,
    bench_codecs,
);

criterion_main!(benches);
