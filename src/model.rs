//! ## Trip Data Model
//!
//! This module defines the trip record ([`Trip`]), the normalized payment method
//! ([`PaymentMethod`]), and [`TripSet`], the handle every query operates on.
//!
//! After ingestion all trips live in a single in-memory table with the columns listed in
//! [`columns`]. A `TripSet` is a lazy DataFusion plan over that table (the whole table or a
//! filtered subset of it); nothing is executed until an aggregation collects it.

use crate::exceptions::{TripMetricsError, TripMetricsResult};
use arrow::array::{
    Array, ArrayRef, Float64Array, Int64Array, StringArray, TimestampNanosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDateTime;
use datafusion::prelude::*;
use std::fmt;
use std::sync::Arc;

/// Column names of the normalized trip table.
pub mod columns {
    pub const PICKUP_AT: &str = "pickup_at";
    pub const DROPOFF_AT: &str = "dropoff_at";
    pub const PICKUP_ZONE: &str = "pickup_zone";
    pub const DROPOFF_ZONE: &str = "dropoff_zone";
    pub const FARE: &str = "fare";
    pub const DISTANCE: &str = "distance";
    pub const PAYMENT: &str = "payment";
    pub const TIP: &str = "tip";
    pub const PASSENGERS: &str = "passengers";

    /// All columns, in table order.
    pub const ALL: [&str; 9] = [
        PICKUP_AT,
        DROPOFF_AT,
        PICKUP_ZONE,
        DROPOFF_ZONE,
        FARE,
        DISTANCE,
        PAYMENT,
        TIP,
        PASSENGERS,
    ];
}

/// A DataFusion context for trip queries. One partition keeps every query pass on the
/// calling thread and makes the row order of unsorted results stable.
pub(crate) fn session_context() -> SessionContext {
    SessionContext::new_with_config(SessionConfig::new().with_target_partitions(1))
}

/// Arrow schema of the normalized trip table.
pub fn trip_schema() -> SchemaRef {
    let timestamp = DataType::Timestamp(TimeUnit::Nanosecond, None);
    Arc::new(Schema::new(vec![
        Field::new(columns::PICKUP_AT, timestamp.clone(), true),
        Field::new(columns::DROPOFF_AT, timestamp, true),
        Field::new(columns::PICKUP_ZONE, DataType::Utf8, true),
        Field::new(columns::DROPOFF_ZONE, DataType::Utf8, true),
        Field::new(columns::FARE, DataType::Float64, true),
        Field::new(columns::DISTANCE, DataType::Float64, true),
        Field::new(columns::PAYMENT, DataType::Utf8, true),
        Field::new(columns::TIP, DataType::Float64, true),
        Field::new(columns::PASSENGERS, DataType::Int64, true),
    ]))
}

/// Raw payment values (lowercased, trimmed) that mean a card payment.
/// `1` is the TLC code for credit card.
pub(crate) const CREDIT_CARD_VALUES: [&str; 6] =
    ["1", "1.0", "credit card", "credit_card", "credit", "card"];

/// Raw payment values (lowercased, trimmed) that mean cash. `2` is the TLC code for cash.
pub(crate) const CASH_VALUES: [&str; 3] = ["2", "2.0", "cash"];

/// How a trip was paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PaymentMethod {
    CreditCard,
    Cash,
    /// Any other or unknown payment type (no charge, dispute, voided, missing...).
    Other,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::CreditCard,
        PaymentMethod::Cash,
        PaymentMethod::Other,
    ];

    /// Normalizes a raw source value (TLC code or label).
    pub fn parse(raw: &str) -> Self {
        let value = raw.trim().to_lowercase();
        if CREDIT_CARD_VALUES.contains(&value.as_str()) {
            PaymentMethod::CreditCard
        } else if CASH_VALUES.contains(&value.as_str()) {
            PaymentMethod::Cash
        } else {
            PaymentMethod::Other
        }
    }

    /// Label stored in the `payment` column of the trip table.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Other => "other",
        }
    }

    /// Inverse of [`PaymentMethod::label`]. Unknown labels map to `Other`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "credit_card" => PaymentMethod::CreditCard,
            "cash" => PaymentMethod::Cash,
            _ => PaymentMethod::Other,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentMethod::CreditCard => "Credit card",
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Other => "Other",
        };
        f.pad(name)
    }
}

/// One ride record.
#[derive(Debug, Clone, PartialEq)]
pub struct Trip {
    pub pickup_at: NaiveDateTime,
    pub dropoff_at: Option<NaiveDateTime>,
    pub pickup_zone: String,
    pub dropoff_zone: Option<String>,
    pub fare: f64,
    /// `None` when the source value was missing, unparsable or negative.
    pub distance: Option<f64>,
    pub payment: PaymentMethod,
    pub tip: Option<f64>,
    pub passengers: Option<i64>,
}

/// A lazy, immutable view over a subset of the loaded trips.
///
/// Cloning a `TripSet` only clones the logical plan.
#[derive(Clone)]
pub struct TripSet {
    df: DataFrame,
}

impl TripSet {
    /// Wraps a DataFrame that already has the normalized trip columns.
    ///
    /// Returns `MissingColumn` if any column from [`columns::ALL`] is absent.
    pub fn from_frame(df: DataFrame) -> TripMetricsResult<Self> {
        let schema = df.schema();
        for name in columns::ALL {
            if schema.field_with_name(None, name).is_err() {
                return Err(TripMetricsError::MissingColumn(format!(
                    "Column '{}' not found in trip table",
                    name
                )));
            }
        }
        Ok(Self { df })
    }

    /// Builds an in-memory trip set from records.
    ///
    /// Records are expected to satisfy the trip invariants (non-negative fare, non-empty
    /// pickup zone); they are stored as given.
    pub fn from_trips(trips: &[Trip]) -> TripMetricsResult<Self> {
        let batch = trips_to_batch(trips)?;
        let df = session_context().read_batch(batch)?;
        Ok(Self { df })
    }

    /// The underlying logical plan.
    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    /// A copy of the plan to build a query on.
    pub(crate) fn plan(&self) -> DataFrame {
        self.df.clone()
    }

    pub(crate) fn with_plan(df: DataFrame) -> Self {
        Self { df }
    }
}

impl fmt::Debug for TripSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TripSet")
            .field("columns", &self.df.schema().field_names())
            .finish()
    }
}

/// Looks up a column of a collected batch and downcasts it to the expected array type.
pub(crate) fn typed_column<'a, T: Array + 'static>(
    batch: &'a RecordBatch,
    name: &str,
) -> TripMetricsResult<&'a T> {
    batch
        .column_by_name(name)
        .ok_or_else(|| TripMetricsError::MissingColumn(format!("Column '{}' not found", name)))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| {
            TripMetricsError::DataFusionError(datafusion::error::DataFusionError::Plan(format!(
                "Unexpected data type for column {}",
                name
            )))
        })
}

pub(crate) fn opt_f64(array: &Float64Array, i: usize) -> Option<f64> {
    (!array.is_null(i)).then(|| array.value(i))
}

pub(crate) fn opt_i64(array: &Int64Array, i: usize) -> Option<i64> {
    (!array.is_null(i)).then(|| array.value(i))
}

pub(crate) fn opt_str(array: &StringArray, i: usize) -> Option<String> {
    (!array.is_null(i)).then(|| array.value(i).to_string())
}

fn timestamp_nanos(value: NaiveDateTime) -> TripMetricsResult<i64> {
    value.and_utc().timestamp_nanos_opt().ok_or_else(|| {
        TripMetricsError::InvalidArgument(format!(
            "Timestamp {} is outside the supported range",
            value
        ))
    })
}

/// Converts records into a batch with the [`trip_schema`] layout.
pub fn trips_to_batch(trips: &[Trip]) -> TripMetricsResult<RecordBatch> {
    let pickup_at = trips
        .iter()
        .map(|t| timestamp_nanos(t.pickup_at))
        .collect::<TripMetricsResult<Vec<_>>>()?;
    let dropoff_at = trips
        .iter()
        .map(|t| t.dropoff_at.map(timestamp_nanos).transpose())
        .collect::<TripMetricsResult<Vec<_>>>()?;

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(TimestampNanosecondArray::from(pickup_at)),
        Arc::new(TimestampNanosecondArray::from(dropoff_at)),
        Arc::new(StringArray::from(
            trips.iter().map(|t| t.pickup_zone.clone()).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            trips
                .iter()
                .map(|t| t.dropoff_zone.clone())
                .collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            trips.iter().map(|t| t.fare).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            trips.iter().map(|t| t.distance).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            trips.iter().map(|t| t.payment.label()).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            trips.iter().map(|t| t.tip).collect::<Vec<_>>(),
        )),
        Arc::new(Int64Array::from(
            trips.iter().map(|t| t.passengers).collect::<Vec<_>>(),
        )),
    ];
    Ok(RecordBatch::try_new(trip_schema(), arrays)?)
}

/// Materializes a trip set into records, ordered by pickup time then pickup zone.
pub(crate) async fn collect_trips(trips: &TripSet) -> TripMetricsResult<Vec<Trip>> {
    let batches = trips
        .plan()
        .sort(vec![
            col(columns::PICKUP_AT).sort(true, false),
            col(columns::PICKUP_ZONE).sort(true, false),
        ])?
        .collect()
        .await?;

    let mut out = Vec::new();
    for batch in &batches {
        let pickup_at = typed_column::<TimestampNanosecondArray>(batch, columns::PICKUP_AT)?;
        let dropoff_at = typed_column::<TimestampNanosecondArray>(batch, columns::DROPOFF_AT)?;
        let pickup_zone = typed_column::<StringArray>(batch, columns::PICKUP_ZONE)?;
        let dropoff_zone = typed_column::<StringArray>(batch, columns::DROPOFF_ZONE)?;
        let fare = typed_column::<Float64Array>(batch, columns::FARE)?;
        let distance = typed_column::<Float64Array>(batch, columns::DISTANCE)?;
        let payment = typed_column::<StringArray>(batch, columns::PAYMENT)?;
        let tip = typed_column::<Float64Array>(batch, columns::TIP)?;
        let passengers = typed_column::<Int64Array>(batch, columns::PASSENGERS)?;

        for i in 0..batch.num_rows() {
            let pickup = pickup_at.value_as_datetime(i).ok_or_else(|| {
                TripMetricsError::InvalidArgument(format!(
                    "Pickup timestamp {} is out of range",
                    pickup_at.value(i)
                ))
            })?;
            let dropoff = if dropoff_at.is_null(i) {
                None
            } else {
                dropoff_at.value_as_datetime(i)
            };
            out.push(Trip {
                pickup_at: pickup,
                dropoff_at: dropoff,
                pickup_zone: pickup_zone.value(i).to_string(),
                dropoff_zone: opt_str(dropoff_zone, i),
                fare: fare.value(i),
                distance: opt_f64(distance, i),
                payment: PaymentMethod::from_label(payment.value(i)),
                tip: opt_f64(tip, i),
                passengers: opt_i64(passengers, i),
            });
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_parse_codes_and_labels() {
        assert_eq!(PaymentMethod::parse("1"), PaymentMethod::CreditCard);
        assert_eq!(PaymentMethod::parse(" Credit Card "), PaymentMethod::CreditCard);
        assert_eq!(PaymentMethod::parse("2"), PaymentMethod::Cash);
        assert_eq!(PaymentMethod::parse("CASH"), PaymentMethod::Cash);
        assert_eq!(PaymentMethod::parse("3"), PaymentMethod::Other);
        assert_eq!(PaymentMethod::parse(""), PaymentMethod::Other);
    }

    #[test]
    fn test_payment_label_round_trip() {
        for method in PaymentMethod::ALL {
            assert_eq!(PaymentMethod::from_label(method.label()), method);
        }
        assert_eq!(PaymentMethod::from_label("voided"), PaymentMethod::Other);
    }
}
