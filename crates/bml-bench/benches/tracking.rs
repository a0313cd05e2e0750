//! Criterion benchmarks for plain-particle tracking.

use std::hint::black_box;

use bml_bench::{beam, fodo_ring, ENERGY};
use bml_core::Particle;
use bml_propagators::{ElementFactory, QuadModel, TrackingConfig};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_single_particle(c: &mut Criterion) {
    let f = ElementFactory::new(TrackingConfig::default()).unwrap();
    let ring = fodo_ring(&f, 100).unwrap();
    let start = Particle::proton_with_energy(ENERGY).with_state([1e-3, -5e-4, 0.0, 1e-5, 0.0, 1e-4]);

    c.bench_function("single_particle_100_cells", |b| {
        b.iter(|| {
            let mut p = start.clone();
            ring.propagate(&mut p).unwrap();
            black_box(p)
        });
    });
}

fn bench_quad_models(c: &mut Criterion) {
    let mut group = c.benchmark_group("quad_model");
    for (label, model) in [
        ("linear", QuadModel::Linear),
        ("multikick_4", QuadModel::MultiKick { kicks: 4 }),
        ("multikick_32", QuadModel::MultiKick { kicks: 32 }),
    ] {
        let cfg = TrackingConfig {
            quadrupole: model,
            ..TrackingConfig::default()
        };
        let f = ElementFactory::new(cfg).unwrap();
        let ring = fodo_ring(&f, 100).unwrap();
        let start = Particle::proton_with_energy(ENERGY).with_state([1e-3, 0.0, 0.0, 0.0, 0.0, 0.0]);
        group.bench_function(label, |b| {
            b.iter(|| {
                let mut p = start.clone();
                ring.propagate(&mut p).unwrap();
                black_box(p)
            });
        });
    }
    group.finish();
}

fn bench_bunch(c: &mut Criterion) {
    let f = ElementFactory::new(TrackingConfig::default()).unwrap();
    let ring = fodo_ring(&f, 10).unwrap();
    let mut group = c.benchmark_group("bunch_10_cells");
    for count in [100usize, 1_000] {
        let template = beam(count, 42);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                let mut bunch = template.clone();
                let lost = ring.propagate_bunch(&mut bunch);
                black_box((bunch, lost))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_single_particle, bench_quad_models, bench_bunch);
criterion_main!(benches);
