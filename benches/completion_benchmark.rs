use criterion::measurement::Measurement;
use criterion::{criterion_group, criterion_main, BenchmarkGroup, BenchmarkId, Criterion};
use ndarray::Array2;
use rand::distr::{Distribution, Uniform};
use rand::{rngs::StdRng, SeedableRng};
use single_impute::evaluation::mask_random_entries;
use single_impute::mask::MissingMask;
use single_impute::LowRankImputerBuilder;
use std::time::Duration;

#[derive(Clone)]
pub struct CompletionBenchConfig {
    seed: u64,
    matrix_sizes: Vec<(usize, usize)>,
    ranks: Vec<usize>,
    missing_fraction: f64,
    measurement_time: u64,
    sample_size: usize,
}

impl Default for CompletionBenchConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            matrix_sizes: vec![(50, 4), (64, 100), (200, 50), (500, 200)],
            ranks: vec![1, 3],
            missing_fraction: 0.2,
            measurement_time: 10,
            sample_size: 10,
        }
    }
}

// Rank-3 signal plus uniform noise.
fn create_low_rank_matrix(rows: usize, cols: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let factor_dist = Uniform::try_from(-1.0..1.0).unwrap();
    let noise_dist = Uniform::try_from(-0.05..0.05).unwrap();

    let left = Array2::from_shape_fn((rows, 3), |_| factor_dist.sample(&mut rng));
    let right = Array2::from_shape_fn((3, cols), |_| factor_dist.sample(&mut rng));
    let mut x = left.dot(&right);
    x.mapv_inplace(|v| v + noise_dist.sample(&mut rng));
    x
}

fn configure_group<'a, M: Measurement>(
    c: &'a mut Criterion<M>,
    name: &str,
    config: &CompletionBenchConfig,
) -> BenchmarkGroup<'a, M> {
    let mut group = c.benchmark_group(name);
    group.measurement_time(Duration::from_secs(config.measurement_time));
    group.sample_size(config.sample_size);
    group
}

pub fn bench_completion(c: &mut Criterion) {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = CompletionBenchConfig::default();
    let mut group = configure_group(c, "Low_Rank_Completion", &config);

    for &(rows, cols) in config.matrix_sizes.iter() {
        let seed = config.seed + (rows * cols) as u64;
        let truth = create_low_rank_matrix(rows, cols, seed);
        let n_omit = ((rows as f64) * config.missing_fraction) as usize;
        let (observed, _) = mask_random_entries(truth.view(), n_omit, seed).unwrap();

        for &rank in config.ranks.iter().filter(|&&r| r <= rows.min(cols)) {
            let imputer = LowRankImputerBuilder::new().rank(rank).build();
            group.bench_with_input(
                BenchmarkId::new(format!("rank_{}", rank), format!("{}x{}", rows, cols)),
                &(rows, cols, rank),
                |b, _| {
                    b.iter(|| imputer.complete(observed.view()).unwrap());
                },
            );
        }
    }
    group.finish();
}

pub fn bench_mask_metrics(c: &mut Criterion) {
    let config = CompletionBenchConfig::default();
    let mut group = configure_group(c, "Mask_Metrics", &config);

    for &(rows, cols) in config.matrix_sizes.iter() {
        let seed = config.seed + (rows * cols) as u64;
        let truth = create_low_rank_matrix(rows, cols, seed);
        let (observed, mask) = mask_random_entries(truth.view(), rows / 2, seed).unwrap();

        group.bench_with_input(
            BenchmarkId::new("column_means", format!("{}x{}", rows, cols)),
            &(rows, cols),
            |b, _| {
                b.iter(|| mask.column_means(observed.view()).unwrap());
            },
        );

        group.bench_with_input(
            BenchmarkId::new("from_nan", format!("{}x{}", rows, cols)),
            &(rows, cols),
            |b, _| {
                b.iter(|| MissingMask::from_nan(observed.view()));
            },
        );
    }
    group.finish();
}

criterion_group!(completion_benches, bench_completion, bench_mask_metrics);
criterion_main!(completion_benches);
