use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use forensic_triage::anomaly::{AnomalyDetector, IsolationForest};
use forensic_triage::config::{ContaminationRate, FeatureMode, TriageConfig};
use forensic_triage::pipeline::TriagePipeline;
use forensic_triage::preprocessing::{select_features, StandardScaler};
use polars::prelude::*;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn create_log_data(n_rows: usize) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(0);

    let src: Vec<String> = (0..n_rows).map(|i| format!("10.0.{}.{}", i / 256 % 256, i % 256)).collect();
    let bytes: Vec<i64> = (0..n_rows)
        .map(|_| {
            if rng.gen::<f64>() < 0.01 {
                rng.gen_range(1_000_000..10_000_000)
            } else {
                rng.gen_range(500..5_000)
            }
        })
        .collect();
    let duration: Vec<f64> = (0..n_rows).map(|_| rng.gen::<f64>() * 30.0).collect();
    let port: Vec<i64> = (0..n_rows).map(|_| [22i64, 80, 443, 8080][rng.gen_range(0..4)]).collect();

    df!(
        "src_ip" => &src,
        "bytes_transferred" => &bytes,
        "duration" => &duration,
        "dst_port" => &port,
    )
    .unwrap()
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);

    for n_rows in [1_000, 10_000, 50_000].iter() {
        let df = create_log_data(*n_rows);
        let pipeline = TriagePipeline::new(TriageConfig::interactive()).unwrap();

        group.bench_with_input(BenchmarkId::new("run", n_rows), &df, |b, df| {
            b.iter(|| pipeline.run(black_box(df)).unwrap())
        });
    }

    group.finish();
}

fn bench_isolation_forest(c: &mut Criterion) {
    let mut group = c.benchmark_group("isolation_forest");

    let df = create_log_data(10_000);
    let features = select_features(&df, &FeatureMode::AutoNumeric).unwrap();
    let x = StandardScaler::new().fit_transform(&df, &features).unwrap();

    group.bench_function("fit_predict", |b| {
        b.iter(|| {
            let mut forest = IsolationForest::new()
                .with_contamination(ContaminationRate::from_percent(5).unwrap());
            forest.fit_predict(black_box(&x)).unwrap()
        })
    });

    let mut fitted = IsolationForest::new();
    fitted.fit(&x).unwrap();
    group.bench_function("score_samples", |b| {
        b.iter(|| fitted.score_samples(black_box(&x)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_pipeline, bench_isolation_forest);
criterion_main!(benches);
