//! Performance benchmarks for epoch-atlas-lib
//!
//! Run with: cargo bench --package epoch-atlas-lib

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use epoch_atlas_lib::{Atlas, City, Datasets, EngineConfig, Region, Year};
use geo::{Geometry, LineString, Polygon};
use std::collections::BTreeMap;

/// Irregular polygon with `vertices` points around a center
fn generate_blob(cx: f64, cy: f64, radius: f64, vertices: usize) -> Geometry<f64> {
    let coords: Vec<(f64, f64)> = (0..vertices)
        .map(|i| {
            let theta = i as f64 / vertices as f64 * std::f64::consts::TAU;
            let r = radius * (1.0 + 0.2 * (theta * 7.0).sin());
            (cx + r * theta.cos(), cy + r * theta.sin())
        })
        .collect();
    Geometry::Polygon(Polygon::new(LineString::from(coords), vec![]))
}

/// A world of `entities` polities, each split into `fragments` consecutive records
fn generate_world(entities: usize, fragments: usize, vertices: usize) -> Datasets {
    let mut regions = Vec::with_capacity(entities * fragments);
    for e in 0..entities {
        let cx = -170.0 + (e % 34) as f64 * 10.0;
        let cy = -60.0 + (e / 34) as f64 * 10.0;
        for f in 0..fragments {
            let from = -3000 + (f as Year) * 250 + (e as Year % 7) * 3;
            let region = Region::new(
                format!("Entity {e}"),
                from,
                from + 245,
                10_000.0 + e as f64,
                generate_blob(cx, cy, 4.0, vertices),
            )
            .unwrap();
            regions.push(region);
        }
    }

    let cities = (0..entities * 4)
        .map(|i| {
            let populations: BTreeMap<Year, u32> = (0..20)
                .map(|k| (-2500 + k * 250, 1_000 + (i as u32 % 50) * 1_000 + k as u32 * 500))
                .collect();
            City::new(
                format!("City {i}"),
                -170.0 + (i % 136) as f64 * 2.5,
                -60.0 + (i / 136) as f64 * 2.5,
                populations,
                None,
                None,
            )
            .unwrap()
        })
        .collect();

    Datasets {
        regions,
        cities,
        ..Datasets::default()
    }
}

// ============================================================================
// Core Benchmarks - Key performance indicators
// ============================================================================

fn bench_point_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("point_query");

    let atlas = Atlas::new(EngineConfig::default(), generate_world(300, 20, 200));

    group.bench_function("region_at_6k_fragments", |b| {
        b.iter(|| atlas.region_at(0.5, 0.5, 100));
    });

    group.bench_function("city_region_6k_fragments", |b| {
        b.iter(|| atlas.city_region(4.9, 0.0, 100));
    });

    group.bench_function("history_6k_fragments", |b| {
        b.iter(|| atlas.history(0.5, 0.5));
    });

    group.finish();
}

fn bench_year_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("year_metrics");
    group.sample_size(20);

    let world = generate_world(300, 20, 50);
    let fragments = world.regions.len() + world.cities.len();

    group.throughput(Throughput::Elements(fragments as u64));
    for year in [-2000, 0, 1500] {
        group.bench_with_input(BenchmarkId::new("uncached", year), &year, |b, &year| {
            b.iter_batched(
                || Atlas::new(EngineConfig::default(), world.clone()),
                |atlas| atlas.year_metrics(year),
                criterion::BatchSize::LargeInput,
            );
        });
    }

    let atlas = Atlas::new(EngineConfig::default(), world);
    atlas.year_metrics(0);
    group.bench_function("cached", |b| {
        b.iter(|| atlas.year_metrics(0));
    });

    group.finish();
}

fn bench_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("construction");
    group.sample_size(20);

    let world = generate_world(300, 20, 50);
    group.throughput(Throughput::Elements(world.regions.len() as u64));
    group.bench_function("atlas_new_6k", |b| {
        b.iter(|| Atlas::new(EngineConfig::default(), world.clone()));
    });

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(
    benches,
    bench_point_queries,
    bench_year_metrics,
    bench_construction,
);

criterion_main!(benches);
