use advgen::{AdversarialBatchGenerator, Dataset, Fgsm, GeneratorConfig, SoftmaxClassifier};
use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::{Array1, Array4};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use pprof::criterion::{Output, PProfProfiler};
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use std::time::Duration;

fn build_dataset<R: Rng>(len: usize, dims: (usize, usize, usize), rng: &mut R) -> Dataset {
    let (h, w, c) = dims;
    let images = Array4::random_using((len, h, w, c), Uniform::new(0., 1.), rng);
    let labels: Array1<usize> = (0..len).map(|_| rng.gen_range(0..10)).collect();
    Dataset::new(images, labels).unwrap()
}

fn bench(c: &mut Criterion) {
    let mut rng = Pcg64::seed_from_u64(69);
    let dims = (28, 28, 1);
    let dataset = build_dataset(1000, dims, &mut rng);
    let model = SoftmaxClassifier::random(dims, 10, &mut rng);

    let mut group = c.benchmark_group("generator");
    group.warm_up_time(Duration::from_secs(3));
    for total in [1, 32, 128] {
        let config = GeneratorConfig::new(total, dims);
        let mut generator = AdversarialBatchGenerator::with_rng(
            &model,
            &dataset,
            Fgsm::clipped(0., 1.),
            config,
            Pcg64::from_rng(&mut rng).unwrap(),
        )
        .unwrap();
        group.bench_function(format!("next_batch::fgsm@{}", total), |b| {
            b.iter(|| generator.next_batch().unwrap())
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)));
    targets = bench
}
criterion_main!(benches);
