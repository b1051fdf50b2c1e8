use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use trip_metrics::exceptions::TripMetricsResult;
use trip_metrics::filters::{DateRange, TripFilter};
use trip_metrics::metrics::daily::daily_aggregates;
use trip_metrics::metrics::kpis::summary_kpis;
use trip_metrics::metrics::payment::payment_breakdown;
use trip_metrics::settings::DistanceUnit;
use trip_metrics::{PaymentMethod, Trip, TripMetricsEngine, TripSet};

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 12, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Helper function to create `n` trips spread over several days, hours and payment methods.
fn spread_trips(n: usize) -> Vec<Trip> {
    (0..n)
        .map(|i| Trip {
            pickup_at: start() + Duration::minutes(97 * i as i64),
            dropoff_at: None,
            pickup_zone: format!("{}", 100 + i % 7),
            dropoff_zone: Some(format!("{}", 200 + i % 5)),
            fare: 5.0 + (i % 11) as f64,
            distance: if i % 4 == 0 { None } else { Some(0.5 * i as f64) },
            payment: PaymentMethod::ALL[i % 3],
            tip: Some(1.0),
            passengers: Some(1 + (i % 3) as i64),
        })
        .collect()
}

#[tokio::test]
async fn test_daily_ride_counts_sum_to_input() -> TripMetricsResult<()> {
    for n in [1, 7, 40, 123] {
        let trips = TripSet::from_trips(&spread_trips(n))?;
        let days = daily_aggregates(&trips).await?;
        let total: u64 = days.iter().map(|d| d.rides).sum();
        assert_eq!(total as usize, n, "ride count mismatch for {} trips", n);
        assert!(days.windows(2).all(|w| w[0].day < w[1].day));
    }
    Ok(())
}

#[tokio::test]
async fn test_payment_percentages_sum_to_100() -> TripMetricsResult<()> {
    for n in [1, 2, 10, 77] {
        let trips = TripSet::from_trips(&spread_trips(n))?;
        let breakdown = payment_breakdown(&trips).await?;
        let total: f64 = breakdown.shares.values().map(|s| s.ride_pct).sum();
        assert_relative_eq!(total, 100.0, epsilon = 1e-6);
        let revenue_total: f64 = breakdown.shares.values().map(|s| s.revenue_pct).sum();
        assert_relative_eq!(revenue_total, 100.0, epsilon = 1e-6);
    }
    Ok(())
}

#[tokio::test]
async fn test_payment_breakdown_of_empty_set() -> TripMetricsResult<()> {
    let trips = TripSet::from_trips(&[])?;
    let breakdown = payment_breakdown(&trips).await?;
    assert!(breakdown.is_empty());
    assert_eq!(breakdown.total_rides, 0);
    Ok(())
}

#[tokio::test]
async fn test_summary_kpis_of_empty_set() -> TripMetricsResult<()> {
    let trips = TripSet::from_trips(&[])?;
    let kpis = summary_kpis(&trips).await?;
    assert_eq!(kpis.total_rides, 0);
    assert_eq!(kpis.total_revenue, 0.0);
    assert_eq!(kpis.avg_distance, 0.0);
    Ok(())
}

#[tokio::test]
async fn test_date_range_returns_only_trips_in_range() -> TripMetricsResult<()> {
    let records = spread_trips(60);
    let trips = TripSet::from_trips(&records)?;
    let range = DateRange::new(
        start() + Duration::hours(10),
        start() + Duration::hours(30),
    )?;
    let filtered = range.apply(&trips)?;
    let kpis = summary_kpis(&filtered).await?;
    let expected = records.iter().filter(|t| range.contains(t.pickup_at)).count();
    assert!(expected > 0);
    assert_eq!(kpis.total_rides as usize, expected);
    Ok(())
}

#[test]
fn test_engine_from_trips_drops_invalid_records() -> TripMetricsResult<()> {
    let mut records = spread_trips(10);
    records[0].fare = -5.0;
    records[1].pickup_zone = " ".to_string();
    records[2].distance = Some(-3.0);
    let engine = TripMetricsEngine::from_trips(records, DistanceUnit::Miles)?;
    assert_eq!(engine.report().total_rows, 10);
    assert_eq!(engine.report().dropped_rows, 2);

    let trips = engine.trips(&engine.all_trips())?;
    assert_eq!(trips.len(), 8);
    assert!(trips.iter().all(|t| t.fare >= 0.0));
    assert!(trips.iter().all(|t| t.distance.map_or(true, |d| d >= 0.0)));
    Ok(())
}
