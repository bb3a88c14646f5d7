//! Benchmark for tile generation and window streaming.
//!
//! TARGET: crossing a tile boundary (3 tiles of 64x64) within one 60 FPS frame
//!
//! Run with: cargo bench --package meadow_procedural --bench tile_benchmark

use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use meadow_procedural::{
    NoiseAlgorithm, NoiseSource, Quadtree, TerrainConfig, Tile, TileCoord, TileManager,
};

fn benchmark_quadtree(c: &mut Criterion) {
    c.bench_function("quadtree_build_64", |b| {
        b.iter(|| black_box(Quadtree::new(black_box(64))));
    });

    let quadtree = Quadtree::new(64).expect("valid width");
    c.bench_function("quadtree_indices_max_lod_64", |b| {
        b.iter(|| black_box(quadtree.indices_of_level(6)));
    });
}

fn benchmark_tile_regeneration(c: &mut Criterion) {
    let config = Rc::new(TerrainConfig::default());
    let noise = NoiseSource::new(NoiseAlgorithm::Perlin, 64.0).into_shared();
    let mut tile = Tile::new(TileCoord::new(0, 0), noise, config).expect("valid config");

    let mut group = c.benchmark_group("tile");
    group.throughput(Throughput::Elements(65 * 65));

    group.bench_function("update_coordinates_64", |b| {
        let mut x = 0;
        b.iter(|| {
            x += 1;
            tile.update_coordinates(TileCoord::new(x, x / 2));
            black_box(tile.vertices().len())
        });
    });

    group.finish();
}

fn benchmark_window_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("tile_manager");
    group.sample_size(20);

    // One boundary crossing per iteration
    group.bench_function("walk_east_one_tile", |b| {
        let mut manager =
            TileManager::new(TerrainConfig::default(), [32.0, 32.0]).expect("valid config");
        let mut x = 32.0f32;
        b.iter(|| {
            x += 64.0;
            black_box(manager.update([x, 32.0]))
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_quadtree,
    benchmark_tile_regeneration,
    benchmark_window_walk
);
criterion_main!(benches);
