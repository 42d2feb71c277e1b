use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use refine_epoch::EpochSyncDomain;
use std::hint::black_box;

// Benchmark 1: The mutator-side hot path. One acquire load plus one
// release store; this is the cost the protocol adds to a pre-existing
// synchronization point.
fn bench_update_epoch(c: &mut Criterion) {
    c.bench_function("refine_epoch_update_epoch", |b| {
        let domain = EpochSyncDomain::new();
        let mutator = domain.register_mutator();

        b.iter(|| {
            mutator.update_epoch();
            black_box(());
        });
    });

    // Comparison point: crossbeam-epoch's pin, the closest analogue of
    // "enter a synchronization point" in a general-purpose epoch scheme.
    c.bench_function("crossbeam_epoch_pin", |b| {
        b.iter(|| {
            let _guard = crossbeam_epoch::pin();
            black_box(());
        });
    });
}

// Benchmark 2: The unarmed poll, which mutators execute far more often
// than anything else in this crate.
fn bench_poll_fast_path(c: &mut Criterion) {
    c.bench_function("refine_epoch_poll_unarmed", |b| {
        let domain = EpochSyncDomain::new();
        let mutator = domain.register_mutator();

        b.iter(|| {
            mutator.poll();
            black_box(());
        });
    });
}

// Benchmark 3: Mutator-side cost as the registered population grows.
// The update itself should not depend on the number of mutators.
fn bench_update_with_population(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_epoch_population");

    for population in [1, 8, 64].iter() {
        group.bench_with_input(
            BenchmarkId::new("refine_epoch", population),
            population,
            |b, &population| {
                let domain = EpochSyncDomain::new();
                let _others: Vec<_> = (0..population - 1)
                    .map(|_| domain.register_mutator())
                    .collect();
                let mutator = domain.register_mutator();

                b.iter(|| {
                    mutator.update_epoch();
                    black_box(());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_update_epoch,
    bench_poll_fast_path,
    bench_update_with_population
);
criterion_main!(benches);
