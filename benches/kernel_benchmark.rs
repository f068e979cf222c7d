//! Benchmarks for kernel evaluation and training

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use svmqp::core::{KernelType, Parameters, Problem, SilentSink, SparseVector, SvmType};
use svmqp::kernel::{Kernel, KernelFunction};
use svmqp::Model;

fn random_vector(rng: &mut StdRng, dim: usize, density: f64) -> SparseVector {
    let pairs: Vec<(usize, f64)> = (1..=dim)
        .filter(|_| rng.gen_bool(density))
        .map(|i| (i, rng.gen_range(-1.0..1.0)))
        .collect();
    SparseVector::from_pairs(&pairs)
}

fn two_clusters(n: usize, dim: usize, seed: u64) -> Problem {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut labels = Vec::with_capacity(n);
    let mut vectors = Vec::with_capacity(n);
    for i in 0..n {
        let label = if i % 2 == 0 { 1.0 } else { -1.0 };
        let dense: Vec<f64> = (0..dim)
            .map(|_| label * 0.5 + rng.gen_range(-1.0..1.0))
            .collect();
        labels.push(label);
        vectors.push(SparseVector::from_dense(&dense));
    }
    Problem::new(labels, vectors).expect("labels and vectors have equal length")
}

fn bench_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel_compute");
    let mut rng = StdRng::seed_from_u64(7);
    let x = random_vector(&mut rng, 1000, 0.1);
    let y = random_vector(&mut rng, 1000, 0.1);

    for kernel_type in [
        KernelType::Linear,
        KernelType::Polynomial,
        KernelType::Gaussian,
        KernelType::Laplace,
    ] {
        let params = Parameters {
            gamma: 0.01,
            ..Parameters::new(SvmType::CSvc, kernel_type)
        };
        let kernel = KernelFunction::from_parameters(&params);
        group.bench_function(kernel_type.name(), |b| {
            b.iter(|| kernel.compute(black_box(&x), black_box(&y)))
        });
    }

    group.finish();
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("train_c_svc");
    group.sample_size(10);

    for size in [100, 400].iter() {
        let problem = two_clusters(*size, 10, 42);
        let params = Parameters::new(SvmType::CSvc, KernelType::Gaussian);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| Model::train(black_box(&problem), &params, &SilentSink).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_kernels, bench_training);
criterion_main!(benches);
