use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use p2_gravity::catalog::{normalize, CatalogRecord};
use p2_gravity::models::target::{format_dec, format_ra, parse_dec, parse_ra};

fn bench_formatting(c: &mut Criterion) {
    let mut group = c.benchmark_group("sexagesimal_formatting");

    group.bench_function("format_ra", |b| {
        b.iter(|| {
            for i in 0..1000 {
                let ra = i as f64 * 0.359;
                black_box(format_ra(black_box(ra)));
            }
        });
    });

    group.bench_function("format_dec", |b| {
        b.iter(|| {
            for i in 0..1000 {
                let dec = -90.0 + i as f64 * 0.18;
                black_box(format_dec(black_box(dec)));
            }
        });
    });

    group.finish();
}

fn bench_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("sexagesimal_parsing");

    let ra = "04:41:04.770";
    group.bench_with_input(BenchmarkId::new("parse_ra", ra), &ra, |b, input| {
        b.iter(|| parse_ra(black_box(input)));
    });

    let dec = "-16:42:58.017";
    group.bench_with_input(BenchmarkId::new("parse_dec", dec), &dec, |b, input| {
        b.iter(|| parse_dec(black_box(input)));
    });

    group.finish();
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalog_normalization");

    let record = CatalogRecord {
        pm_ra: Some(-546.01),
        pm_dec: Some(93.4),
        parallax: Some(25.0),
        flux_k: Some(5.0),
        ..CatalogRecord::new("HD 1234", 70.269_875, 13.928_527_78)
    };
    group.bench_function("normalize", |b| {
        b.iter(|| normalize(black_box("HD 1234"), black_box(&record)));
    });

    group.finish();
}

criterion_group!(benches, bench_formatting, bench_parsing, bench_normalize);
criterion_main!(benches);
