use criterion::*;
use std::hint::black_box;

use component_archive::ComponentArchive;

mod common;
use common::*;

fn attach_benchmark(c: &mut Criterion) {
    init_components();

    let mut group = c.benchmark_group("attach");
    group.sample_size(10);

    for &(label, n) in &[
        ("populate_100k", AGENTS_SMALL),
        ("populate_1M", AGENTS_MED),
    ] {
        group.bench_function(label, |b| {
            b.iter_batched(
                ComponentArchive::new,
                |mut archive| {
                    let entities = populate(&mut archive, n);
                    black_box(entities);
                    black_box(archive);
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.bench_function("populate_100k_pooled", |b| {
        b.iter_batched(
            ComponentArchive::with_pool,
            |mut archive| {
                let entities = populate(&mut archive, AGENTS_SMALL);
                black_box(entities);
                black_box(archive);
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, attach_benchmark);
criterion_main!(benches);
