//! Benchmarks for tile resolution through a shared source.
//!
//! ## Running the benchmarks
//!
//! ```bash
//! cargo bench -p ztile-source
//! ```
//!
//! ## Benchmarks included
//!
//! - `decode/elevation_i16` - Decoding one 259x259 int16 payload
//! - `resolve/threads_N` - N threads resolving 64 keys each against one source
//! - `ancestor/depth_N` - Ancestor search for a key N levels below the deepest tile

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;
use ztile_archive::fixture::TreeFixture;
use ztile_source::{
    ElevationDataType, ElevationDecoder, ElevationHeader, ElevationTileSource, LayerKind, QuadTreeTileKey,
    TileDecoder, TileSourceConfig,
};

fn i16_payload(seed: i16) -> Vec<u8> {
    let header = ElevationHeader {
        data_type: ElevationDataType::I16.code(),
        ..Default::default()
    };
    let mut bytes = header.to_le_bytes().to_vec();
    for i in 0..259 * 259 {
        bytes.extend_from_slice(&seed.wrapping_add((i % 512) as i16).to_le_bytes());
    }
    bytes
}

/// Planet with a full 8x16 grid at quadtree level 3.
fn planet() -> (TempDir, ElevationTileSource) {
    let mut fixture = TreeFixture::new();
    for row in 0..8 {
        for col in 0..16 {
            fixture = fixture.with_tile(7, row, col, i16_payload((row * 16 + col) as i16));
        }
    }
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    fixture
        .write_layer(dir.path(), LayerKind::Elevation)
        .expect("Failed to write tree");
    let source = ElevationTileSource::open(dir.path(), &TileSourceConfig::default());
    (dir, source)
}

fn bench_decode(c: &mut Criterion) {
    let payload = i16_payload(100);
    let decoder = ElevationDecoder::new(32767);

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("elevation_i16", |b| {
        b.iter(|| black_box(decoder.decode(black_box(&payload)).is_ok()))
    });
    group.finish();
}

fn bench_concurrent_resolve(c: &mut Criterion) {
    let (_dir, source) = planet();
    let source = Arc::new(source);

    let mut group = c.benchmark_group("resolve");
    group.sample_size(20);

    for threads in [1usize, 2, 4, 8].iter() {
        group.throughput(Throughput::Elements((*threads * 64) as u64));
        group.bench_with_input(BenchmarkId::new("threads", threads), threads, |b, &count| {
            b.iter(|| {
                let handles: Vec<_> = (0..count)
                    .map(|t| {
                        let source = Arc::clone(&source);
                        thread::spawn(move || {
                            let mut found = 0;
                            for i in 0..64u32 {
                                let key = QuadTreeTileKey::new(3, (i + t as u32) % 16, i % 8);
                                found += source.create_image(key).is_some() as usize;
                            }
                            found
                        })
                    })
                    .collect();
                let found: usize = handles.into_iter().filter_map(|h| h.join().ok()).sum();
                black_box(found)
            });
        });
    }

    group.finish();
}

fn bench_ancestor_search(c: &mut Criterion) {
    let (_dir, source) = planet();

    let mut group = c.benchmark_group("ancestor");
    for depth in [1u32, 4, 12].iter() {
        let key = QuadTreeTileKey::new(3 + depth, 5 << depth, 3 << depth);
        group.bench_with_input(BenchmarkId::new("depth", depth), &key, |b, &key| {
            b.iter(|| black_box(source.highest_available_level(black_box(key))))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_decode, bench_concurrent_resolve, bench_ancestor_search);
criterion_main!(benches);
