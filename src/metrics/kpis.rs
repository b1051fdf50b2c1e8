//! ## Headline KPIs
//!
//! Single-number summaries shown as KPI cards. An empty trip set yields all zeros.

use crate::exceptions::TripMetricsResult;
use crate::metrics::tip_pct_expr;
use crate::model::{columns, opt_f64, typed_column, TripSet};
use arrow::array::{Float64Array, Int64Array};
use datafusion::functions_aggregate::expr_fn::{avg, count, sum};
use datafusion::logical_expr::col;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SummaryKpis {
    pub total_rides: u64,
    pub total_revenue: f64,
    /// Average over trips with a known distance; zero when there are none.
    pub avg_distance: f64,
    pub avg_fare: f64,
    /// Average tip as a percentage of the fare; zero when no trip has a tip.
    pub avg_tip_pct: f64,
}

/// Total rides, total revenue and averages over the set.
pub async fn summary_kpis(trips: &TripSet) -> TripMetricsResult<SummaryKpis> {
    let batches = trips
        .plan()
        .aggregate(
            vec![],
            vec![
                count(col(columns::PICKUP_AT)).alias("rides"),
                sum(col(columns::FARE)).alias("revenue"),
                avg(col(columns::DISTANCE)).alias("avg_distance"),
                avg(col(columns::FARE)).alias("avg_fare"),
                avg(tip_pct_expr()).alias("avg_tip_pct"),
            ],
        )?
        .collect()
        .await?;

    let batch = match batches.iter().find(|b| b.num_rows() > 0) {
        Some(batch) => batch,
        None => return Ok(SummaryKpis::default()),
    };
    let rides = typed_column::<Int64Array>(batch, "rides")?;
    let revenue = typed_column::<Float64Array>(batch, "revenue")?;
    let avg_distance = typed_column::<Float64Array>(batch, "avg_distance")?;
    let avg_fare = typed_column::<Float64Array>(batch, "avg_fare")?;
    let avg_tip_pct = typed_column::<Float64Array>(batch, "avg_tip_pct")?;

    Ok(SummaryKpis {
        total_rides: rides.value(0) as u64,
        total_revenue: opt_f64(revenue, 0).unwrap_or(0.0),
        avg_distance: opt_f64(avg_distance, 0).unwrap_or(0.0),
        avg_fare: opt_f64(avg_fare, 0).unwrap_or(0.0),
        avg_tip_pct: opt_f64(avg_tip_pct, 0).unwrap_or(0.0),
    })
}
