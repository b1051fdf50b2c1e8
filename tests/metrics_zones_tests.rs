use chrono::NaiveDate;
use trip_metrics::exceptions::{TripMetricsError, TripMetricsResult};
use trip_metrics::metrics::zones::{top_zones, ZoneKind};
use trip_metrics::{PaymentMethod, Trip, TripMetricsEngine, TripSet};

/// Helper function to create trips picked up in the given zones, one trip per entry.
fn trips_in_zones(zones: &[(&str, usize)]) -> Vec<Trip> {
    let pickup = NaiveDate::from_ymd_opt(2024, 12, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    zones
        .iter()
        .flat_map(|(zone, n)| {
            (0..*n).map(move |_| Trip {
                pickup_at: pickup,
                dropoff_at: None,
                pickup_zone: zone.to_string(),
                dropoff_zone: None,
                fare: 10.0,
                distance: Some(1.0),
                payment: PaymentMethod::CreditCard,
                tip: None,
                passengers: None,
            })
        })
        .collect()
}

#[tokio::test]
async fn test_top_zones_breaks_ties_by_identifier() -> TripMetricsResult<()> {
    // Listed in reverse so the tie-break cannot come from input order.
    let trips = TripSet::from_trips(&trips_in_zones(&[("D", 1), ("C", 5), ("B", 10), ("A", 10)]))?;
    let top = top_zones(&trips, ZoneKind::Pickup, 3).await?;
    let zones: Vec<&str> = top.iter().map(|z| z.zone.as_str()).collect();
    assert_eq!(zones, vec!["A", "B", "C"]);
    let rides: Vec<u64> = top.iter().map(|z| z.rides).collect();
    assert_eq!(rides, vec![10, 10, 5]);
    Ok(())
}

#[tokio::test]
async fn test_top_zones_with_k_larger_than_zone_count() -> TripMetricsResult<()> {
    let trips = TripSet::from_trips(&trips_in_zones(&[("A", 2), ("B", 1)]))?;
    let top = top_zones(&trips, ZoneKind::Pickup, 10).await?;
    assert_eq!(top.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_top_zones_rejects_zero_k() -> TripMetricsResult<()> {
    let trips = TripSet::from_trips(&trips_in_zones(&[("A", 2)]))?;
    let result = top_zones(&trips, ZoneKind::Pickup, 0).await;
    assert!(matches!(result, Err(TripMetricsError::InvalidArgument(_))));
    Ok(())
}

#[tokio::test]
async fn test_dropoff_zones_ignore_missing_zone() -> TripMetricsResult<()> {
    let mut records = trips_in_zones(&[("A", 3)]);
    records[0].dropoff_zone = Some("Z".to_string());
    let trips = TripSet::from_trips(&records)?;
    let top = top_zones(&trips, ZoneKind::Dropoff, 5).await?;
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].zone, "Z");
    assert_eq!(top[0].rides, 1);
    Ok(())
}

#[test]
fn test_top_pickup_zones_from_csv() -> TripMetricsResult<()> {
    let engine = TripMetricsEngine::open("tests/testdata/zone_ties.csv")?;
    assert_eq!(engine.report().loaded_rows, 26);
    let top = engine.top_pickup_zones(&engine.all_trips(), 3)?;
    let zones: Vec<&str> = top.iter().map(|z| z.zone.as_str()).collect();
    assert_eq!(zones, vec!["A", "B", "C"]);
    Ok(())
}

#[tokio::test]
async fn test_numeric_zone_ids_tie_break_as_text() -> TripMetricsResult<()> {
    let trips = TripSet::from_trips(&trips_in_zones(&[("50", 2), ("230", 2), ("138", 2)]))?;
    let top = top_zones(&trips, ZoneKind::Pickup, 3).await?;
    let zones: Vec<&str> = top.iter().map(|z| z.zone.as_str()).collect();
    assert_eq!(zones, vec!["138", "230", "50"]);
    Ok(())
}
