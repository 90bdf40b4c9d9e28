use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use demtin::generate_tin_mesh;
use demtin::testing::synthetic_dem;

pub fn criterion_benchmark(c: &mut Criterion) {
  c.bench_function("greedy_insert(64x64)", |b| {
    b.iter_batched(
      || synthetic_dem(64, 64, 10.0, 50.0),
      |dem| generate_tin_mesh(dem, 0.5),
      BatchSize::SmallInput,
    )
  });

  c.bench_function("greedy_insert(256x256)", |b| {
    b.iter_batched(
      || synthetic_dem(256, 256, 10.0, 50.0),
      |dem| generate_tin_mesh(dem, 0.5),
      BatchSize::LargeInput,
    )
  });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
