//! ## Distributions
//!
//! Breakdowns behind the "peak hours", "trip length" and "passenger count" charts:
//!
//! - **hourly_trends:** rides and revenue per pickup hour of day.
//! - **trip_length_distribution:** rides per trip-length bucket (Short, Medium, Long, Very Long).
//! - **passenger_breakdown:** rides per passenger count.

use crate::exceptions::{TripMetricsError, TripMetricsResult};
use crate::model::{columns, opt_f64, typed_column, TripSet};
use crate::settings::DistanceUnit;
use arrow::array::{Float64Array, Int64Array};
use datafusion::arrow::datatypes::DataType;
use datafusion::functions_aggregate::expr_fn::{count, sum};
use datafusion::logical_expr::{cast, col, lit, Case as DFCase, Expr};
use datafusion_functions::datetime::date_part;
use std::fmt;

/// Rides and revenue for one hour of the day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourlyTrend {
    /// 0 to 23.
    pub hour: u32,
    pub rides: u64,
    pub revenue: f64,
}

/// Rides and revenue per pickup hour, ascending. Hours without trips are omitted.
pub async fn hourly_trends(trips: &TripSet) -> TripMetricsResult<Vec<HourlyTrend>> {
    let hour = cast(
        date_part().call(vec![lit("hour"), col(columns::PICKUP_AT)]),
        DataType::Int64,
    );
    let batches = trips
        .plan()
        .aggregate(
            vec![hour.alias("pickup_hour")],
            vec![
                count(col(columns::PICKUP_AT)).alias("rides"),
                sum(col(columns::FARE)).alias("revenue"),
            ],
        )?
        .sort(vec![col("pickup_hour").sort(true, false)])?
        .collect()
        .await?;

    let mut hours = Vec::new();
    for batch in &batches {
        let pickup_hour = typed_column::<Int64Array>(batch, "pickup_hour")?;
        let rides = typed_column::<Int64Array>(batch, "rides")?;
        let revenue = typed_column::<Float64Array>(batch, "revenue")?;
        for i in 0..batch.num_rows() {
            hours.push(HourlyTrend {
                hour: pickup_hour.value(i) as u32,
                rides: rides.value(i) as u64,
                revenue: opt_f64(revenue, i).unwrap_or(0.0),
            });
        }
    }
    Ok(hours)
}

/// Trip-length classes. Bounds are defined in miles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TripLengthBucket {
    /// Under 2 miles.
    Short,
    /// 2 miles up to (not including) 10 miles.
    Medium,
    /// 10 to 30 miles, both inclusive.
    Long,
    /// Over 30 miles.
    VeryLong,
}

impl TripLengthBucket {
    /// All buckets, in chart order.
    pub const ALL: [TripLengthBucket; 4] = [
        TripLengthBucket::Short,
        TripLengthBucket::Medium,
        TripLengthBucket::Long,
        TripLengthBucket::VeryLong,
    ];

    /// Classifies a distance given in `unit`.
    pub fn classify(distance: f64, unit: DistanceUnit) -> Self {
        if distance < unit.from_miles(2.0) {
            TripLengthBucket::Short
        } else if distance < unit.from_miles(10.0) {
            TripLengthBucket::Medium
        } else if distance <= unit.from_miles(30.0) {
            TripLengthBucket::Long
        } else {
            TripLengthBucket::VeryLong
        }
    }

    fn index(&self) -> usize {
        match self {
            TripLengthBucket::Short => 0,
            TripLengthBucket::Medium => 1,
            TripLengthBucket::Long => 2,
            TripLengthBucket::VeryLong => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TripLengthBucket::Short => "Short (<2mi)",
            TripLengthBucket::Medium => "Medium (2-10mi)",
            TripLengthBucket::Long => "Long (10-30mi)",
            TripLengthBucket::VeryLong => "Very Long (>30mi)",
        }
    }
}

impl fmt::Display for TripLengthBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TripLengthCount {
    pub bucket: TripLengthBucket,
    pub rides: u64,
}

/// Same thresholds as [`TripLengthBucket::classify`], as a CASE expression yielding the
/// bucket index.
fn bucket_expr(unit: DistanceUnit) -> Expr {
    let distance = col(columns::DISTANCE);
    let when = |condition: Expr, bucket: TripLengthBucket| {
        (Box::new(condition), Box::new(lit(bucket.index() as i64)))
    };
    Expr::Case(DFCase {
        expr: None,
        when_then_expr: vec![
            when(
                distance.clone().lt(lit(unit.from_miles(2.0))),
                TripLengthBucket::Short,
            ),
            when(
                distance.clone().lt(lit(unit.from_miles(10.0))),
                TripLengthBucket::Medium,
            ),
            when(
                distance.lt_eq(lit(unit.from_miles(30.0))),
                TripLengthBucket::Long,
            ),
        ],
        else_expr: Some(Box::new(lit(TripLengthBucket::VeryLong.index() as i64))),
    })
}

/// Rides per trip-length bucket. All four buckets are returned, in chart order, including
/// empty ones. Trips with an unknown distance are not counted.
pub async fn trip_length_distribution(
    trips: &TripSet,
    unit: DistanceUnit,
) -> TripMetricsResult<Vec<TripLengthCount>> {
    let batches = trips
        .plan()
        .filter(col(columns::DISTANCE).is_not_null())?
        .aggregate(
            vec![bucket_expr(unit).alias("bucket")],
            vec![count(col(columns::PICKUP_AT)).alias("rides")],
        )?
        .collect()
        .await?;

    let mut counts = [0u64; 4];
    for batch in &batches {
        let bucket = typed_column::<Int64Array>(batch, "bucket")?;
        let rides = typed_column::<Int64Array>(batch, "rides")?;
        for i in 0..batch.num_rows() {
            let index = usize::try_from(bucket.value(i))
                .ok()
                .filter(|index| *index < counts.len())
                .ok_or_else(|| {
                    TripMetricsError::InvalidArgument(format!(
                        "Unknown trip length bucket {}",
                        bucket.value(i)
                    ))
                })?;
            counts[index] += rides.value(i) as u64;
        }
    }

    Ok(TripLengthBucket::ALL
        .iter()
        .map(|bucket| TripLengthCount {
            bucket: *bucket,
            rides: counts[bucket.index()],
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassengerCount {
    pub passengers: i64,
    pub rides: u64,
}

/// Rides per passenger count, ascending. Trips without a passenger count are not listed.
pub async fn passenger_breakdown(trips: &TripSet) -> TripMetricsResult<Vec<PassengerCount>> {
    let batches = trips
        .plan()
        .filter(col(columns::PASSENGERS).is_not_null())?
        .aggregate(
            vec![col(columns::PASSENGERS)],
            vec![count(col(columns::PICKUP_AT)).alias("rides")],
        )?
        .sort(vec![col(columns::PASSENGERS).sort(true, false)])?
        .collect()
        .await?;

    let mut breakdown = Vec::new();
    for batch in &batches {
        let passengers = typed_column::<Int64Array>(batch, columns::PASSENGERS)?;
        let rides = typed_column::<Int64Array>(batch, "rides")?;
        for i in 0..batch.num_rows() {
            breakdown.push(PassengerCount {
                passengers: passengers.value(i),
                rides: rides.value(i) as u64,
            });
        }
    }
    Ok(breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_in_miles() {
        assert_eq!(
            TripLengthBucket::classify(1.99, DistanceUnit::Miles),
            TripLengthBucket::Short
        );
        assert_eq!(
            TripLengthBucket::classify(2.0, DistanceUnit::Miles),
            TripLengthBucket::Medium
        );
        assert_eq!(
            TripLengthBucket::classify(30.0, DistanceUnit::Miles),
            TripLengthBucket::Long
        );
        assert_eq!(
            TripLengthBucket::classify(30.5, DistanceUnit::Miles),
            TripLengthBucket::VeryLong
        );
    }

    #[test]
    fn test_classify_scales_kilometers() {
        // 5 km is about 3.1 miles.
        assert_eq!(
            TripLengthBucket::classify(5.0, DistanceUnit::Kilometers),
            TripLengthBucket::Medium
        );
        assert_eq!(
            TripLengthBucket::classify(3.0, DistanceUnit::Kilometers),
            TripLengthBucket::Short
        );
    }

    #[test]
    fn test_bucket_labels_follow_chart_order() {
        let labels: Vec<&str> = TripLengthBucket::ALL.iter().map(|b| b.label()).collect();
        assert_eq!(
            labels,
            vec![
                "Short (<2mi)",
                "Medium (2-10mi)",
                "Long (10-30mi)",
                "Very Long (>30mi)"
            ]
        );
    }
}
