// Run `cargo run --example dashboard_summary -- <path to trips.csv|trips.parquet>`
// Without an argument the bundled sample under tests/testdata is used.

use std::error::Error;
use trip_metrics::TripMetricsEngine;

const SAMPLE: &str = "tests/testdata/trips_sample.csv";

fn main() -> Result<(), Box<dyn Error>> {
    let path = std::env::args().nth(1).unwrap_or_else(|| SAMPLE.to_string());
    let engine = TripMetricsEngine::open(&path)?;
    let report = engine.report();
    println!(
        "Loaded {} of {} rows from {} ({} skipped)",
        report.loaded_rows, report.total_rows, path, report.dropped_rows
    );

    let trips = engine.all_trips();
    let kpis = engine.summary_kpis(&trips)?;
    println!("Total rides:      {}", kpis.total_rides);
    println!("Total revenue:    ${:.2}", kpis.total_revenue);
    println!("Average fare:     ${:.2}", kpis.avg_fare);
    println!("Average distance: {:.2}", kpis.avg_distance);
    println!("Average tip:      {:.1}%", kpis.avg_tip_pct);

    println!("\nDaily");
    for day in engine.daily_aggregates(&trips)? {
        println!("  {}  {:>6} rides  ${:>10.2}", day.day, day.rides, day.revenue);
    }

    println!("\nPayment methods");
    let payments = engine.payment_breakdown(&trips)?;
    for (method, share) in &payments.shares {
        println!("  {:<12} {:>6} rides ({:.1}%)", method, share.rides, share.ride_pct);
    }

    println!("\nTop pickup zones");
    for zone in engine.top_pickup_zones(&trips, 10)? {
        println!("  {:<8} {:>6} rides  ${:>10.2}", zone.zone, zone.rides, zone.revenue);
    }

    println!("\nTrip lengths");
    for bucket in engine.trip_length_distribution(&trips)? {
        println!("  {:<20} {:>6}", bucket.bucket.label(), bucket.rides);
    }

    let highlights = engine.highlights(&trips)?;
    if let Some(day) = highlights.peak_revenue_day {
        println!("\nBest revenue day: {} (${:.2})", day.day, day.revenue);
    }
    if let Some(hour) = highlights.peak_hour {
        println!("Busiest hour:     {:02}:00 ({} rides)", hour.hour, hour.rides);
    }

    engine.close();
    Ok(())
}
