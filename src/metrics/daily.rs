//! ## Daily aggregates
//!
//! Groups trips by the calendar day of their pickup time. The result feeds the daily revenue
//! and daily trips charts, the revenue-per-trip chart, and the "top days" tables.

use crate::exceptions::{TripMetricsError, TripMetricsResult};
use crate::metrics::{check_top_k, tip_pct_expr};
use crate::model::{columns, opt_f64, typed_column, TripSet};
use arrow::array::{Date32Array, Float64Array, Int64Array};
use chrono::NaiveDate;
use datafusion::arrow::datatypes::DataType;
use datafusion::functions_aggregate::expr_fn::{avg, count, sum};
use datafusion::logical_expr::{cast, col};
use std::cmp::Ordering;
use tracing::debug;

/// Metrics of one calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyAggregate {
    pub day: NaiveDate,
    pub rides: u64,
    pub revenue: f64,
    /// Revenue per ride.
    pub avg_fare: f64,
    /// `None` if no trip of the day has a known distance.
    pub avg_distance: Option<f64>,
    /// `None` if no trip of the day has a known tip and a positive fare.
    pub avg_tip_pct: Option<f64>,
}

/// Ride count, revenue and averages per day, ordered by day ascending.
/// Days without trips are not listed.
pub async fn daily_aggregates(trips: &TripSet) -> TripMetricsResult<Vec<DailyAggregate>> {
    let df = trips
        .plan()
        .aggregate(
            vec![cast(col(columns::PICKUP_AT), DataType::Date32).alias("trip_date")],
            vec![
                count(col(columns::PICKUP_AT)).alias("rides"),
                sum(col(columns::FARE)).alias("revenue"),
                avg(col(columns::FARE)).alias("avg_fare"),
                avg(col(columns::DISTANCE)).alias("avg_distance"),
                avg(tip_pct_expr()).alias("avg_tip_pct"),
            ],
        )?
        .sort(vec![col("trip_date").sort(true, false)])?;
    let batches = df.collect().await?;

    let mut days = Vec::new();
    for batch in &batches {
        let trip_date = typed_column::<Date32Array>(batch, "trip_date")?;
        let rides = typed_column::<Int64Array>(batch, "rides")?;
        let revenue = typed_column::<Float64Array>(batch, "revenue")?;
        let avg_fare = typed_column::<Float64Array>(batch, "avg_fare")?;
        let avg_distance = typed_column::<Float64Array>(batch, "avg_distance")?;
        let avg_tip_pct = typed_column::<Float64Array>(batch, "avg_tip_pct")?;
        for i in 0..batch.num_rows() {
            let day = trip_date.value_as_date(i).ok_or_else(|| {
                TripMetricsError::InvalidArgument(format!(
                    "Day {} is out of range",
                    trip_date.value(i)
                ))
            })?;
            days.push(DailyAggregate {
                day,
                rides: rides.value(i) as u64,
                revenue: opt_f64(revenue, i).unwrap_or(0.0),
                avg_fare: opt_f64(avg_fare, i).unwrap_or(0.0),
                avg_distance: opt_f64(avg_distance, i),
                avg_tip_pct: opt_f64(avg_tip_pct, i),
            });
        }
    }
    debug!("Computed daily aggregates for {} days", days.len());
    Ok(days)
}

/// What the "top days" tables rank by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayRanking {
    Revenue,
    Rides,
}

/// The `k` best days by `ranking`, best first. Ties go to the earlier day.
pub fn rank_days(
    days: &[DailyAggregate],
    k: usize,
    ranking: DayRanking,
) -> TripMetricsResult<Vec<DailyAggregate>> {
    check_top_k(k, "top days")?;
    let mut ranked = days.to_vec();
    ranked.sort_by(|a, b| {
        let by_metric = match ranking {
            DayRanking::Revenue => b.revenue.partial_cmp(&a.revenue).unwrap_or(Ordering::Equal),
            DayRanking::Rides => b.rides.cmp(&a.rides),
        };
        by_metric.then_with(|| a.day.cmp(&b.day))
    });
    ranked.truncate(k);
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32, rides: u64, revenue: f64) -> DailyAggregate {
        DailyAggregate {
            day: NaiveDate::from_ymd_opt(2024, 12, d).unwrap(),
            rides,
            revenue,
            avg_fare: revenue / rides as f64,
            avg_distance: None,
            avg_tip_pct: None,
        }
    }

    #[test]
    fn test_rank_days_by_rides_breaks_ties_by_day() {
        let days = vec![day(1, 3, 70.0), day(2, 3, 110.0), day(3, 2, 19.0)];
        let top = rank_days(&days, 2, DayRanking::Rides).unwrap();
        assert_eq!(top[0].day.to_string(), "2024-12-01");
        assert_eq!(top[1].day.to_string(), "2024-12-02");
    }

    #[test]
    fn test_rank_days_by_revenue() {
        let days = vec![day(1, 3, 70.0), day(2, 3, 110.0), day(3, 2, 19.0)];
        let top = rank_days(&days, 5, DayRanking::Revenue).unwrap();
        let order: Vec<u64> = top.iter().map(|d| d.revenue as u64).collect();
        assert_eq!(order, vec![110, 70, 19]);
    }

    #[test]
    fn test_rank_days_rejects_zero_k() {
        assert!(rank_days(&[], 0, DayRanking::Revenue).is_err());
    }
}
