use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use turnover_predictor::training::{train, ModelType, TrainingConfig};

fn create_turnover_data(n_rows: usize, n_features: usize) -> (Array2<f64>, Array1<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let x = Array2::from_shape_fn((n_rows, n_features), |_| rng.gen::<f64>() * 10.0);

    // Roughly one in five rows is positive
    let y: Array1<f64> = x
        .rows()
        .into_iter()
        .map(|row| if row[0] + row[1] * 0.5 > 11.0 { 1.0 } else { 0.0 })
        .collect();

    (x, y)
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10);

    for n_rows in [500, 2000].iter() {
        let data = create_turnover_data(*n_rows, 10);

        for model_type in [ModelType::RandomForest, ModelType::GradientBoosting] {
            let config = TrainingConfig::new(model_type).with_n_estimators(50);
            group.bench_with_input(
                BenchmarkId::new(format!("fit_{}", model_type), n_rows),
                &data,
                |b, (x, y)| b.iter(|| train(black_box(x), black_box(y), &config).unwrap()),
            );
        }
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");

    let (x, y) = create_turnover_data(2000, 10);
    let model = train(&x, &y, &TrainingConfig::default().with_n_estimators(100)).unwrap();

    group.bench_function("predict_proba_2000", |b| {
        b.iter(|| model.predict_proba(black_box(&x)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_training, bench_prediction);
criterion_main!(benches);
