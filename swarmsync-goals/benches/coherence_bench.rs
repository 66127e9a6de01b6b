use criterion::{black_box, criterion_group, criterion_main, Criterion};
use swarmsync_goals::coherence::coherence;

fn bench_coherence(c: &mut Criterion) {
    let phases: Vec<f64> = (0..10_000).map(|i| i as f64 * 0.0001).collect();

    c.bench_function("coherence_10k_agents", |b| {
        b.iter(|| coherence(black_box(&phases)))
    });
}

criterion_group!(benches, bench_coherence);
criterion_main!(benches);
