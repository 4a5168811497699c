//! Benchmarks for locating and applying the patches.
//!
//! - Loading a synthetic game image
//! - Scanning the large `ItemCheck` body with the gate patterns
//! - The whole pipeline: resolve, match, build, splice and serialize

extern crate autofish;

use autofish::{
    autofish::{locate, patch_module, Catalog},
    config::PatchConfig,
    Module,
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

#[path = "../src/test/builder.rs"]
mod builder;

use builder::ImageBuilder;

/// Benchmark parsing the image and building the declaration list.
fn bench_load(c: &mut Criterion) {
    let image = ImageBuilder::terraria().build();

    c.bench_function("module_load", |b| {
        b.iter(|| {
            let module = Module::from_mem(black_box(image.clone())).unwrap();
            black_box(module)
        });
    });
}

/// Benchmark the pattern scans over bodies that are already decoded.
fn bench_scan(c: &mut Criterion) {
    let mut module = Module::from_mem(ImageBuilder::terraria().build()).unwrap();
    let config = PatchConfig::new();
    locate(&mut module, &config).unwrap();

    c.bench_function("pattern_scan", |b| {
        b.iter(|| {
            let found = locate(black_box(&mut module), &config).unwrap();
            black_box(found)
        });
    });
}

/// Benchmark the fallback gate, which is only found after the primary pattern scanned the
/// whole body.
fn bench_scan_fallback(c: &mut Criterion) {
    let mut module = Module::from_mem(ImageBuilder::terraria().double_gate().build()).unwrap();
    let config = PatchConfig::new();

    c.bench_function("pattern_scan_fallback", |b| {
        b.iter(|| {
            let found = locate(black_box(&mut module), &config).unwrap();
            black_box(found)
        });
    });
}

/// Benchmark symbol resolution.
fn bench_resolve(c: &mut Criterion) {
    let module = Module::from_mem(ImageBuilder::terraria().build()).unwrap();

    c.bench_function("catalog_resolve", |b| {
        b.iter(|| {
            let catalog = Catalog::resolve(black_box(&module)).unwrap();
            black_box(catalog)
        });
    });
}

/// Benchmark patching both methods and serializing the image.
fn bench_patch(c: &mut Criterion) {
    let image = ImageBuilder::terraria().build();
    let config = PatchConfig::new();

    c.bench_function("patch_and_serialize", |b| {
        b.iter(|| {
            let mut module = Module::from_mem(image.clone()).unwrap();
            patch_module(&mut module, &config).unwrap();
            black_box(module.to_bytes().unwrap())
        });
    });
}

criterion_group!(
    benches,
    bench_load,
    bench_scan,
    bench_scan_fallback,
    bench_resolve,
    bench_patch
);
criterion_main!(benches);
