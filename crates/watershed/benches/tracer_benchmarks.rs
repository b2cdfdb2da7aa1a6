//! Benchmarks for upstream tracing and polygonization.
//!
//! Run with: cargo bench --package watershed
//! Or: cargo bench --package watershed --bench tracer_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use terrain_grid::Pixel;
use test_utils::converging_valley;
use watershed::{polygon::boundary_rings, D8Encoding, UpstreamTracer, WatershedPolygonBuilder};

// =============================================================================
// TRACING BENCHMARKS
// =============================================================================

fn bench_trace(c: &mut Criterion) {
    let mut group = c.benchmark_group("trace");

    for size in [64usize, 256, 512] {
        let grids = converging_valley(size, size).build();
        let outlet = Pixel::new(size / 2, size - 1);
        let tracer = UpstreamTracer::new(D8Encoding::Esri, usize::MAX);

        group.throughput(Throughput::Elements((size * size) as u64));
        group.bench_with_input(BenchmarkId::new("valley", size), &size, |b, _| {
            b.iter(|| tracer.trace(black_box(&grids), black_box(outlet)))
        });
    }

    // Small tiles force many window reads
    let grids = converging_valley(256, 256).build();
    let outlet = Pixel::new(128, 255);
    let tracer = UpstreamTracer::new(D8Encoding::Esri, usize::MAX).with_tile_size(32);
    group.bench_function("valley_256_tile_32", |b| {
        b.iter(|| tracer.trace(black_box(&grids), black_box(outlet)))
    });

    group.finish();
}

// =============================================================================
// POLYGON BENCHMARKS
// =============================================================================

fn bench_polygonize(c: &mut Criterion) {
    let mut group = c.benchmark_group("polygonize");

    for size in [64usize, 256] {
        let grids = converging_valley(size, size).build();
        let tracer = UpstreamTracer::new(D8Encoding::Esri, usize::MAX);
        let Ok(mask) = tracer.trace(&grids, Pixel::new(size / 2, size - 1)) else {
            continue;
        };

        group.bench_with_input(BenchmarkId::new("boundary_rings", size), &mask, |b, mask| {
            b.iter(|| boundary_rings(black_box(mask)))
        });

        let builder = WatershedPolygonBuilder::new();
        group.bench_with_input(BenchmarkId::new("build", size), &mask, |b, mask| {
            b.iter(|| builder.build(black_box(mask), &grids))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_trace, bench_polygonize);
criterion_main!(benches);
