use awair_exporter::{render_directory, render_prometheus, BatchResult, Reading, SensorTable};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

const PAYLOAD: &str = r#"{"timestamp":"2024-03-01T12:30:00.000Z","score":91,"dew_point":9.84,"temp":21.5,"humid":52.1,"abs_humid":9.8,"co2":612,"co2_est":400,"voc":220,"voc_baseline":2563140160,"voc_h2_raw":26,"voc_ethanol_raw":38,"pm25":3,"pm10_est":4}"#;

fn batch_of(sensors: usize) -> BatchResult {
    let reading: Reading = serde_json::from_str(PAYLOAD).expect("Should decode payload");
    BatchResult::from_readings((0..sensors).map(|i| (format!("Sensor {:03}", i), reading.clone())))
}

/// Benchmark decoding of a sensor payload
fn bench_payload_decoding(c: &mut Criterion) {
    c.bench_function("reading_decode", |b| {
        b.iter(|| serde_json::from_str::<Reading>(PAYLOAD).expect("Should decode"))
    });
}

/// Benchmark Prometheus text rendering for growing sensor counts
fn bench_prometheus_rendering(c: &mut Criterion) {
    for sensors in [1, 2, 8, 32].iter() {
        let batch = batch_of(*sensors);
        c.bench_with_input(
            BenchmarkId::new("render_prometheus", sensors),
            &batch,
            |b, batch| b.iter(|| render_prometheus(batch)),
        );
    }
}

/// Benchmark the JSON sensor directory
fn bench_directory_rendering(c: &mut Criterion) {
    let table: SensorTable = (0..32)
        .map(|i| (format!("Sensor {:03}", i), format!("192.168.53.{}", i)))
        .collect();

    c.bench_function("render_directory", |b| {
        b.iter(|| render_directory(&table).to_string())
    });
}

criterion_group!(
    benches,
    bench_payload_decoding,
    bench_prometheus_rendering,
    bench_directory_rendering
);
criterion_main!(benches);
