//! Query benchmarks over synthetic trip sessions.
//!
//! Run with: `cargo bench --bench trip_metrics_benchmarks`

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use trip_metrics::metrics::daily::DayRanking;
use trip_metrics::settings::DistanceUnit;
use trip_metrics::{PaymentMethod, Trip, TripMetricsEngine};

/// One month of trips spread over 260 zones.
fn synthetic_trips(n: usize) -> Vec<Trip> {
    let start = NaiveDate::from_ymd_opt(2024, 12, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let span_secs = 31 * 24 * 3600 / n.max(1) as i64;
    (0..n)
        .map(|i| Trip {
            pickup_at: start + Duration::seconds(span_secs * i as i64),
            dropoff_at: Some(start + Duration::seconds(span_secs * i as i64 + 900)),
            pickup_zone: format!("{}", 1 + i * 7 % 260),
            dropoff_zone: Some(format!("{}", 1 + i * 13 % 260)),
            fare: 3.0 + (i % 70) as f64,
            distance: Some(0.2 * (i % 200) as f64),
            payment: PaymentMethod::ALL[i % 3],
            tip: Some((i % 5) as f64),
            passengers: Some(1 + (i % 4) as i64),
        })
        .collect()
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("trip_queries");
    group.sample_size(20);

    for size in [10_000, 100_000] {
        let engine = TripMetricsEngine::from_trips(synthetic_trips(size), DistanceUnit::Miles)
            .expect("Failed to build engine");
        let trips = engine.all_trips();

        group.bench_with_input(BenchmarkId::new("daily_aggregates", size), &size, |b, _| {
            b.iter(|| black_box(engine.daily_aggregates(&trips).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("top_pickup_zones", size), &size, |b, _| {
            b.iter(|| black_box(engine.top_pickup_zones(&trips, 10).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("payment_breakdown", size), &size, |b, _| {
            b.iter(|| black_box(engine.payment_breakdown(&trips).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("top_days", size), &size, |b, _| {
            b.iter(|| black_box(engine.top_days(&trips, 5, DayRanking::Revenue).unwrap()))
        });
    }
    group.finish();
}

fn bench_load_csv(c: &mut Criterion) {
    c.bench_function("load_trips_sample_csv", |b| {
        b.iter(|| {
            let engine = TripMetricsEngine::open("tests/testdata/trips_sample.csv").unwrap();
            black_box(engine.report())
        })
    });
}

criterion_group!(benches, bench_queries, bench_load_csv);
criterion_main!(benches);
