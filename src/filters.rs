//! ## Trip Filters
//!
//! Filters narrow a [`TripSet`] down to the trips a dashboard interaction asks for.
//!
//! - The [`TripFilter`] trait defines the common interface: a filter takes a trip set and
//!   returns a new one whose plan has an extra predicate. Nothing is executed.
//! - [`DateRange`] keeps trips whose pickup time lies in an inclusive range.
//! - [`PaymentFilter`] keeps trips paid with one of the given methods.
//! - [`ZoneFilter`] keeps trips picked up in one of the given zones.
//! - [`apply_filters`] chains several filters in order, like the steps of a pipeline.

use crate::exceptions::{TripMetricsError, TripMetricsResult};
use crate::model::{columns, PaymentMethod, TripSet};
use chrono::{NaiveDate, NaiveDateTime};
use datafusion::logical_expr::{col, lit, Expr};
use datafusion::scalar::ScalarValue;
use tracing::debug;

/// A step that narrows down a trip set.
pub trait TripFilter {
    /// Short name used in log output.
    fn name(&self) -> &str;

    /// Returns the trips of `trips` that pass the filter.
    fn apply(&self, trips: &TripSet) -> TripMetricsResult<TripSet>;
}

fn filter_with(trips: &TripSet, predicate: Expr) -> TripMetricsResult<TripSet> {
    let df = trips.plan().filter(predicate)?;
    Ok(TripSet::with_plan(df))
}

fn timestamp_literal(value: NaiveDateTime) -> TripMetricsResult<Expr> {
    let nanos = value.and_utc().timestamp_nanos_opt().ok_or_else(|| {
        TripMetricsError::InvalidArgument(format!(
            "Timestamp {} is outside the supported range",
            value
        ))
    })?;
    Ok(lit(ScalarValue::TimestampNanosecond(Some(nanos), None)))
}

/// Keeps trips with `start <= pickup_at <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    /// Returns `InvalidArgument` if `start` is after `end`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> TripMetricsResult<Self> {
        if start > end {
            return Err(TripMetricsError::InvalidArgument(format!(
                "Date range start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Whole calendar days: from the start of `first` to the last second of `last`.
    pub fn days(first: NaiveDate, last: NaiveDate) -> TripMetricsResult<Self> {
        match (
            first.and_hms_opt(0, 0, 0),
            last.and_hms_nano_opt(23, 59, 59, 999_999_999),
        ) {
            (Some(start), Some(end)) => Self::new(start, end),
            _ => Err(TripMetricsError::InvalidArgument(format!(
                "Invalid day range {} to {}",
                first, last
            ))),
        }
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at <= self.end
    }
}

impl TripFilter for DateRange {
    fn name(&self) -> &str {
        "date_range"
    }

    fn apply(&self, trips: &TripSet) -> TripMetricsResult<TripSet> {
        let pickup = col(columns::PICKUP_AT);
        let predicate = pickup
            .clone()
            .gt_eq(timestamp_literal(self.start)?)
            .and(pickup.lt_eq(timestamp_literal(self.end)?));
        filter_with(trips, predicate)
    }
}

/// Keeps trips paid with any of the given methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentFilter {
    pub methods: Vec<PaymentMethod>,
}

impl PaymentFilter {
    pub fn new(methods: Vec<PaymentMethod>) -> Self {
        Self { methods }
    }
}

impl TripFilter for PaymentFilter {
    fn name(&self) -> &str {
        "payment"
    }

    fn apply(&self, trips: &TripSet) -> TripMetricsResult<TripSet> {
        let labels = self.methods.iter().map(|m| lit(m.label())).collect();
        filter_with(trips, col(columns::PAYMENT).in_list(labels, false))
    }
}

/// Keeps trips picked up in any of the given zones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneFilter {
    pub zones: Vec<String>,
}

impl ZoneFilter {
    pub fn new(zones: Vec<String>) -> Self {
        Self { zones }
    }
}

impl TripFilter for ZoneFilter {
    fn name(&self) -> &str {
        "pickup_zone"
    }

    fn apply(&self, trips: &TripSet) -> TripMetricsResult<TripSet> {
        let zones = self.zones.iter().map(|z| lit(z.as_str())).collect();
        filter_with(trips, col(columns::PICKUP_ZONE).in_list(zones, false))
    }
}

/// Applies each filter in turn. An empty filter list returns the input unchanged.
pub fn apply_filters(trips: &TripSet, filters: &[&dyn TripFilter]) -> TripMetricsResult<TripSet> {
    let mut current = trips.clone();
    for filter in filters {
        debug!("Applying filter: {}", filter.name());
        current = filter.apply(&current).map_err(|e| match e {
            TripMetricsError::InvalidArgument(msg) => TripMetricsError::InvalidArgument(format!(
                "Error in filter '{}': {}",
                filter.name(),
                msg
            )),
            other => other,
        })?;
    }
    Ok(current)
}
