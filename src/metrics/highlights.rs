//! ## Overview highlights
//!
//! The facts quoted in the overview commentary: the busiest days, the peak hour, the leading
//! zones and the payment method with the largest revenue share.

use crate::exceptions::TripMetricsResult;
use crate::metrics::daily::{daily_aggregates, rank_days, DailyAggregate, DayRanking};
use crate::metrics::distribution::{hourly_trends, HourlyTrend};
use crate::metrics::payment::{payment_breakdown, PaymentShare};
use crate::metrics::zones::{top_zones, ZoneKind, ZoneSummary};
use crate::model::{PaymentMethod, TripSet};

/// Every field is `None` for an empty trip set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Highlights {
    pub peak_revenue_day: Option<DailyAggregate>,
    pub peak_rides_day: Option<DailyAggregate>,
    /// Ties go to the earlier hour.
    pub peak_hour: Option<HourlyTrend>,
    pub top_pickup_zone: Option<ZoneSummary>,
    pub top_dropoff_zone: Option<ZoneSummary>,
    pub top_payment_method: Option<(PaymentMethod, PaymentShare)>,
}

fn peak_hour(hours: &[HourlyTrend]) -> Option<HourlyTrend> {
    hours.iter().fold(None, |best: Option<HourlyTrend>, hour| match best {
        Some(current) if current.rides >= hour.rides => Some(current),
        _ => Some(*hour),
    })
}

pub async fn highlights(trips: &TripSet) -> TripMetricsResult<Highlights> {
    let days = daily_aggregates(trips).await?;
    let hours = hourly_trends(trips).await?;
    let payments = payment_breakdown(trips).await?;

    Ok(Highlights {
        peak_revenue_day: rank_days(&days, 1, DayRanking::Revenue)?.into_iter().next(),
        peak_rides_day: rank_days(&days, 1, DayRanking::Rides)?.into_iter().next(),
        peak_hour: peak_hour(&hours),
        top_pickup_zone: top_zones(trips, ZoneKind::Pickup, 1).await?.into_iter().next(),
        top_dropoff_zone: top_zones(trips, ZoneKind::Dropoff, 1).await?.into_iter().next(),
        top_payment_method: payments.dominant_by_revenue(),
    })
}
