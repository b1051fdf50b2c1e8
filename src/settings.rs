//! ## Ingestion Settings
//!
//! [`IngestOptions`] controls how a trip source is read: which source column feeds each
//! trip field ([`ColumnMapping`]), the CSV delimiter, and the unit the distance column is
//! recorded in ([`DistanceUnit`]). The defaults match the NYC TLC yellow-taxi trip files.
//!
//! ```rust
//! use trip_metrics::settings::{ColumnMapping, DistanceUnit, IngestOptions};
//!
//! let options = IngestOptions::default()
//!     .with_delimiter(b';')
//!     .with_distance_unit(DistanceUnit::Kilometers)
//!     .with_columns(ColumnMapping {
//!         pickup_zone: "zone".to_string(),
//!         ..ColumnMapping::default()
//!     });
//! assert_eq!(options.delimiter, b';');
//! ```

/// Kilometres in one mile.
pub const KM_PER_MILE: f64 = 1.609_344;

/// Unit of the distance column, fixed at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceUnit {
    #[default]
    Miles,
    Kilometers,
}

impl DistanceUnit {
    /// Converts a distance given in miles into this unit.
    pub fn from_miles(&self, miles: f64) -> f64 {
        match self {
            DistanceUnit::Miles => miles,
            DistanceUnit::Kilometers => miles * KM_PER_MILE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceUnit::Miles => "mi",
            DistanceUnit::Kilometers => "km",
        }
    }
}

/// Names of the source columns that feed each trip field.
///
/// `dropoff_time`, `dropoff_zone`, `tip` and `passengers` are optional: when the source
/// does not have them, the corresponding trip fields are left empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub pickup_time: String,
    pub dropoff_time: String,
    pub pickup_zone: String,
    pub dropoff_zone: String,
    pub fare: String,
    pub distance: String,
    pub payment: String,
    pub tip: String,
    pub passengers: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            pickup_time: "tpep_pickup_datetime".to_string(),
            dropoff_time: "tpep_dropoff_datetime".to_string(),
            pickup_zone: "PULocationID".to_string(),
            dropoff_zone: "DOLocationID".to_string(),
            fare: "fare_amount".to_string(),
            distance: "trip_distance".to_string(),
            payment: "payment_type".to_string(),
            tip: "tip_amount".to_string(),
            passengers: "passenger_count".to_string(),
        }
    }
}

impl ColumnMapping {
    /// Mapping for files written by [`crate::engine::TripMetricsEngine::export_parquet`],
    /// which use the normalized trip column names.
    pub fn normalized() -> Self {
        use crate::model::columns;
        Self {
            pickup_time: columns::PICKUP_AT.to_string(),
            dropoff_time: columns::DROPOFF_AT.to_string(),
            pickup_zone: columns::PICKUP_ZONE.to_string(),
            dropoff_zone: columns::DROPOFF_ZONE.to_string(),
            fare: columns::FARE.to_string(),
            distance: columns::DISTANCE.to_string(),
            payment: columns::PAYMENT.to_string(),
            tip: columns::TIP.to_string(),
            passengers: columns::PASSENGERS.to_string(),
        }
    }

    /// Source columns that must be present.
    pub(crate) fn required(&self) -> [&str; 5] {
        [
            self.pickup_time.as_str(),
            self.pickup_zone.as_str(),
            self.fare.as_str(),
            self.distance.as_str(),
            self.payment.as_str(),
        ]
    }
}

/// Options for loading a trip source.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOptions {
    pub columns: ColumnMapping,
    /// Field delimiter for CSV sources (ignored for Parquet).
    pub delimiter: u8,
    pub distance_unit: DistanceUnit,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            columns: ColumnMapping::default(),
            delimiter: b',',
            distance_unit: DistanceUnit::Miles,
        }
    }
}

impl IngestOptions {
    pub fn with_columns(mut self, columns: ColumnMapping) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_distance_unit(mut self, unit: DistanceUnit) -> Self {
        self.distance_unit = unit;
        self
    }
}
