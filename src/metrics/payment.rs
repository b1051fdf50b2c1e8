//! ## Payment-method mix
//!
//! Counts rides and sums revenue per [`PaymentMethod`]. Shares are expressed as percentages
//! of the whole set, so the ride shares of a non-empty set add up to 100.

use crate::exceptions::TripMetricsResult;
use crate::metrics::percentage;
use crate::model::{columns, opt_f64, typed_column, PaymentMethod, TripSet};
use arrow::array::{Float64Array, Int64Array, StringArray};
use datafusion::functions_aggregate::expr_fn::{count, sum};
use datafusion::logical_expr::col;
use std::collections::BTreeMap;

/// Rides and revenue of one payment method.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaymentShare {
    pub rides: u64,
    /// Percentage of all rides in the set.
    pub ride_pct: f64,
    pub revenue: f64,
    /// Percentage of the total revenue of the set.
    pub revenue_pct: f64,
}

/// Payment-method mix of a trip set. Methods without rides are absent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PaymentBreakdown {
    pub total_rides: u64,
    pub total_revenue: f64,
    pub shares: BTreeMap<PaymentMethod, PaymentShare>,
}

impl PaymentBreakdown {
    pub fn get(&self, method: PaymentMethod) -> Option<&PaymentShare> {
        self.shares.get(&method)
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    /// Method with the largest revenue share. Ties go to the method listed first in
    /// [`PaymentMethod::ALL`].
    pub fn dominant_by_revenue(&self) -> Option<(PaymentMethod, PaymentShare)> {
        self.dominant(|share| share.revenue)
    }

    /// Method with the most rides, with the same tie-break as [`Self::dominant_by_revenue`].
    pub fn dominant_by_rides(&self) -> Option<(PaymentMethod, PaymentShare)> {
        self.dominant(|share| share.rides as f64)
    }

    fn dominant(
        &self,
        metric: impl Fn(&PaymentShare) -> f64,
    ) -> Option<(PaymentMethod, PaymentShare)> {
        let mut best: Option<(PaymentMethod, PaymentShare)> = None;
        for (method, share) in &self.shares {
            let better = match &best {
                Some((_, current)) => metric(share) > metric(current),
                None => true,
            };
            if better {
                best = Some((*method, *share));
            }
        }
        best
    }
}

/// Ride count and revenue per payment method, with percentages of the set totals.
pub async fn payment_breakdown(trips: &TripSet) -> TripMetricsResult<PaymentBreakdown> {
    let batches = trips
        .plan()
        .aggregate(
            vec![col(columns::PAYMENT)],
            vec![
                count(col(columns::PICKUP_AT)).alias("rides"),
                sum(col(columns::FARE)).alias("revenue"),
            ],
        )?
        .collect()
        .await?;

    let mut counted = Vec::new();
    for batch in &batches {
        let payment = typed_column::<StringArray>(batch, columns::PAYMENT)?;
        let rides = typed_column::<Int64Array>(batch, "rides")?;
        let revenue = typed_column::<Float64Array>(batch, "revenue")?;
        for i in 0..batch.num_rows() {
            counted.push((
                PaymentMethod::from_label(payment.value(i)),
                rides.value(i) as u64,
                opt_f64(revenue, i).unwrap_or(0.0),
            ));
        }
    }

    let total_rides: u64 = counted.iter().map(|(_, rides, _)| rides).sum();
    let total_revenue: f64 = counted.iter().map(|(_, _, revenue)| revenue).sum();
    let mut shares: BTreeMap<PaymentMethod, PaymentShare> = BTreeMap::new();
    for (method, rides, revenue) in counted {
        // Unknown labels fold into `Other`, so one method may appear more than once.
        let entry = shares.entry(method).or_insert(PaymentShare {
            rides: 0,
            ride_pct: 0.0,
            revenue: 0.0,
            revenue_pct: 0.0,
        });
        entry.rides += rides;
        entry.revenue += revenue;
    }
    for share in shares.values_mut() {
        share.ride_pct = percentage(share.rides as f64, total_rides as f64);
        share.revenue_pct = percentage(share.revenue, total_revenue);
    }

    Ok(PaymentBreakdown {
        total_rides,
        total_revenue,
        shares,
    })
}
