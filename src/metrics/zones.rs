//! ## Zone leaderboards
//!
//! Ranks pickup or dropoff zones by ride count. Ties are broken by zone identifier
//! ascending (compared as text) so the leaderboard is deterministic.

use crate::exceptions::TripMetricsResult;
use crate::metrics::check_top_k;
use crate::model::{columns, opt_f64, typed_column, TripSet};
use arrow::array::{Float64Array, Int64Array, StringArray};
use datafusion::functions_aggregate::expr_fn::{avg, count, sum};
use datafusion::logical_expr::col;

/// Which end of the trip a zone leaderboard looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneKind {
    Pickup,
    Dropoff,
}

impl ZoneKind {
    fn column(&self) -> &'static str {
        match self {
            ZoneKind::Pickup => columns::PICKUP_ZONE,
            ZoneKind::Dropoff => columns::DROPOFF_ZONE,
        }
    }
}

/// One row of a zone leaderboard.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneSummary {
    pub zone: String,
    pub rides: u64,
    pub revenue: f64,
    pub avg_fare: f64,
}

/// The `k` zones with the most rides, descending, ties by zone identifier ascending.
///
/// Identifiers are compared as text, so numeric TLC zone IDs tie-break as `"138" < "50"`.
/// Trips without a zone of the requested kind (possible for dropoff zones) are ignored.
/// Returns `InvalidArgument` if `k` is zero.
pub async fn top_zones(
    trips: &TripSet,
    kind: ZoneKind,
    k: usize,
) -> TripMetricsResult<Vec<ZoneSummary>> {
    check_top_k(k, "zone leaderboard")?;
    let zone = col(kind.column());
    let batches = trips
        .plan()
        .filter(zone.clone().is_not_null())?
        .aggregate(
            vec![zone.alias("zone")],
            vec![
                count(col(columns::PICKUP_AT)).alias("rides"),
                sum(col(columns::FARE)).alias("revenue"),
                avg(col(columns::FARE)).alias("avg_fare"),
            ],
        )?
        .sort(vec![
            col("rides").sort(false, false),
            col("zone").sort(true, false),
        ])?
        .limit(0, Some(k))?
        .collect()
        .await?;

    let mut leaders = Vec::with_capacity(k);
    for batch in &batches {
        let zones = typed_column::<StringArray>(batch, "zone")?;
        let rides = typed_column::<Int64Array>(batch, "rides")?;
        let revenue = typed_column::<Float64Array>(batch, "revenue")?;
        let avg_fare = typed_column::<Float64Array>(batch, "avg_fare")?;
        for i in 0..batch.num_rows() {
            leaders.push(ZoneSummary {
                zone: zones.value(i).to_string(),
                rides: rides.value(i) as u64,
                revenue: opt_f64(revenue, i).unwrap_or(0.0),
                avg_fare: opt_f64(avg_fare, i).unwrap_or(0.0),
            });
        }
    }
    Ok(leaders)
}
