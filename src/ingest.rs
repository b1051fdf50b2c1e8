//! ## Loading trip sources
//!
//! This module turns a CSV or Parquet file into the normalized in-memory trip table.
//!
//! Loading happens in three steps:
//!
//! 1. **Read** the source. CSV files are read with every column typed as text so that a bad
//!    cell never aborts the scan.
//! 2. **Normalize** each field with null-on-failure casts: timestamps and numbers that do not
//!    parse become null, as do NaN and infinite numbers. Negative distances and tips become
//!    null and payment values are mapped onto [`PaymentMethod`](crate::model::PaymentMethod)
//!    labels.
//! 3. **Validate and cache**. Rows without a valid pickup time, a non-negative fare, or a
//!    pickup zone are dropped and counted. The remaining rows are materialized once into memory.
//!
//! Source-level problems (unreadable path, unknown extension, missing required column) are
//! returned as `IngestError`.

use crate::exceptions::{TripMetricsError, TripMetricsResult};
use crate::model::{columns, PaymentMethod, TripSet, CASH_VALUES, CREDIT_CARD_VALUES};
use crate::settings::{ColumnMapping, IngestOptions};
use datafusion::arrow::csv::reader::Format;
use datafusion::arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use datafusion::logical_expr::{ident, lit, try_cast, Case as DFCase, Expr};
use datafusion::prelude::*;
use datafusion::scalar::ScalarValue;
use datafusion_functions::math::isnan;
use datafusion_functions::string::{btrim, lower};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info, warn};

/// Outcome of loading a trip source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestReport {
    /// Data rows found in the source (header excluded).
    pub total_rows: usize,
    pub loaded_rows: usize,
    /// Rows skipped because they were malformed.
    pub dropped_rows: usize,
}

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Parquet,
}

impl SourceFormat {
    /// Detects the format from the file extension.
    pub fn from_path(path: &Path) -> TripMetricsResult<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("csv") => Ok(SourceFormat::Csv),
            Some("parquet") => Ok(SourceFormat::Parquet),
            _ => Err(TripMetricsError::IngestError(format!(
                "Unsupported source format for '{}'. Please provide a CSV or Parquet file.",
                path.display()
            ))),
        }
    }
}

fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Nanosecond, None)
}

fn ingest_error(path: &Path, err: impl std::fmt::Display) -> TripMetricsError {
    TripMetricsError::IngestError(format!("Failed to read '{}': {}", path.display(), err))
}

/// Reads the header row of a CSV file and returns its column names.
///
/// Quoted names and a leading byte-order mark are handled by the arrow CSV reader.
fn read_csv_header(path: &Path, delimiter: u8) -> TripMetricsResult<Vec<String>> {
    let file = File::open(path).map_err(|e| ingest_error(path, e))?;
    let (schema, _) = Format::default()
        .with_header(true)
        .with_delimiter(delimiter)
        .infer_schema(BufReader::new(file), Some(0))
        .map_err(|e| ingest_error(path, e))?;
    let names: Vec<String> = schema
        .fields()
        .iter()
        .map(|field| field.name().trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    if names.iter().all(|name| name.is_empty()) {
        return Err(TripMetricsError::IngestError(format!(
            "'{}' has no header row",
            path.display()
        )));
    }
    Ok(names)
}

/// Reads the raw source into a DataFrame without interpreting any values.
async fn read_source(
    ctx: &SessionContext,
    path: &Path,
    options: &IngestOptions,
) -> TripMetricsResult<DataFrame> {
    let format = SourceFormat::from_path(path)?;
    let location = path.to_str().ok_or_else(|| {
        TripMetricsError::IngestError(format!("Path '{}' is not valid UTF-8", path.display()))
    })?;

    match format {
        SourceFormat::Csv => {
            let header = read_csv_header(path, options.delimiter)?;
            let schema = Schema::new(
                header
                    .iter()
                    .map(|name| Field::new(name, DataType::Utf8, true))
                    .collect::<Vec<_>>(),
            );
            let extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| format!(".{}", ext))
                .unwrap_or_default();
            let read_options = CsvReadOptions::new()
                .has_header(true)
                .delimiter(options.delimiter)
                .schema(&schema)
                .file_extension(&extension);
            ctx.read_csv(location, read_options)
                .await
                .map_err(|e| ingest_error(path, e))
        }
        SourceFormat::Parquet => {
            if !path.exists() {
                return Err(ingest_error(path, "file does not exist"));
            }
            ctx.read_parquet(location, ParquetReadOptions::default())
                .await
                .map_err(|e| ingest_error(path, e))
        }
    }
}

/// Returns an error naming the first required source column that is absent.
fn check_required_columns(df: &DataFrame, mapping: &ColumnMapping) -> TripMetricsResult<()> {
    let schema = df.schema();
    for name in mapping.required() {
        if schema.field_with_name(None, name).is_err() {
            return Err(TripMetricsError::IngestError(format!(
                "Required column '{}' not found in source",
                name
            )));
        }
    }
    Ok(())
}

/// `CASE WHEN value < 0 THEN NULL ELSE value END`
fn null_if_negative(value: Expr) -> Expr {
    Expr::Case(DFCase {
        expr: None,
        when_then_expr: vec![(
            Box::new(value.clone().lt(lit(0.0))),
            Box::new(lit(ScalarValue::Float64(None))),
        )],
        else_expr: Some(Box::new(value)),
    })
}

/// `CASE WHEN isnan(value) OR value IN (inf, -inf) THEN NULL ELSE value END`
///
/// Float comparisons order NaN above every number, so it has to be cleared before any
/// range check.
fn null_if_not_finite(value: Expr) -> Expr {
    let not_finite = isnan()
        .call(vec![value.clone()])
        .or(value.clone().eq(lit(f64::INFINITY)))
        .or(value.clone().eq(lit(f64::NEG_INFINITY)));
    Expr::Case(DFCase {
        expr: None,
        when_then_expr: vec![(
            Box::new(not_finite),
            Box::new(lit(ScalarValue::Float64(None))),
        )],
        else_expr: Some(Box::new(value)),
    })
}

/// `CASE WHEN value = '' THEN NULL ELSE value END`
fn null_if_empty(value: Expr) -> Expr {
    Expr::Case(DFCase {
        expr: None,
        when_then_expr: vec![(
            Box::new(value.clone().eq(lit(""))),
            Box::new(lit(ScalarValue::Utf8(None))),
        )],
        else_expr: Some(Box::new(value)),
    })
}

/// Maps raw payment values onto the labels of [`PaymentMethod`].
fn payment_label_expr(raw: Expr) -> Expr {
    let value = lower().call(vec![btrim().call(vec![raw])]);
    let as_list = |values: &[&str]| values.iter().map(|v| lit(*v)).collect::<Vec<_>>();
    Expr::Case(DFCase {
        expr: None,
        when_then_expr: vec![
            (
                Box::new(value.clone().in_list(as_list(&CREDIT_CARD_VALUES), false)),
                Box::new(lit(PaymentMethod::CreditCard.label())),
            ),
            (
                Box::new(value.in_list(as_list(&CASH_VALUES), false)),
                Box::new(lit(PaymentMethod::Cash.label())),
            ),
        ],
        else_expr: Some(Box::new(lit(PaymentMethod::Other.label()))),
    })
}

/// Builds the projection that turns source columns into the normalized trip columns.
/// Optional source columns that are absent become typed nulls.
fn normalize_exprs(df: &DataFrame, mapping: &ColumnMapping) -> Vec<Expr> {
    let schema = df.schema();
    let present = |name: &str| schema.field_with_name(None, name).is_ok();
    // Going through text first gives CSV and Parquet sources the same conversion rules.
    let text = |name: &str| try_cast(ident(name), DataType::Utf8);
    // Numbers keep only finite values; padding around them is ignored.
    let number = |name: &str| {
        null_if_not_finite(try_cast(
            btrim().call(vec![text(name)]),
            DataType::Float64,
        ))
    };

    let dropoff_at = if present(&mapping.dropoff_time) {
        try_cast(text(&mapping.dropoff_time), timestamp_type())
    } else {
        lit(ScalarValue::TimestampNanosecond(None, None))
    };
    let dropoff_zone = if present(&mapping.dropoff_zone) {
        null_if_empty(btrim().call(vec![text(&mapping.dropoff_zone)]))
    } else {
        lit(ScalarValue::Utf8(None))
    };
    let tip = if present(&mapping.tip) {
        null_if_negative(number(&mapping.tip))
    } else {
        lit(ScalarValue::Float64(None))
    };
    let passengers = if present(&mapping.passengers) {
        // TLC files store passenger counts as "1.0".
        let count = try_cast(number(&mapping.passengers), DataType::Int64);
        Expr::Case(DFCase {
            expr: None,
            when_then_expr: vec![(
                Box::new(count.clone().lt(lit(0i64))),
                Box::new(lit(ScalarValue::Int64(None))),
            )],
            else_expr: Some(Box::new(count)),
        })
    } else {
        lit(ScalarValue::Int64(None))
    };

    vec![
        try_cast(text(&mapping.pickup_time), timestamp_type()).alias(columns::PICKUP_AT),
        dropoff_at.alias(columns::DROPOFF_AT),
        btrim()
            .call(vec![text(&mapping.pickup_zone)])
            .alias(columns::PICKUP_ZONE),
        dropoff_zone.alias(columns::DROPOFF_ZONE),
        number(&mapping.fare).alias(columns::FARE),
        null_if_negative(number(&mapping.distance)).alias(columns::DISTANCE),
        payment_label_expr(text(&mapping.payment)).alias(columns::PAYMENT),
        tip.alias(columns::TIP),
        passengers.alias(columns::PASSENGERS),
    ]
}

/// Predicate that keeps only well-formed trips.
fn valid_trip_predicate() -> Expr {
    col(columns::PICKUP_AT)
        .is_not_null()
        .and(col(columns::FARE).is_not_null())
        .and(col(columns::FARE).gt_eq(lit(0.0)))
        .and(col(columns::PICKUP_ZONE).is_not_null())
        .and(col(columns::PICKUP_ZONE).not_eq(lit("")))
}

/// Loads, normalizes and caches a trip source.
pub(crate) async fn load_trips(
    ctx: &SessionContext,
    path: &Path,
    options: &IngestOptions,
) -> TripMetricsResult<(TripSet, IngestReport)> {
    debug!("Loading trips from {}", path.display());
    let raw = read_source(ctx, path, options).await?;
    check_required_columns(&raw, &options.columns)?;

    let exprs = normalize_exprs(&raw, &options.columns);
    let normalized = raw.select(exprs)?;
    let total_rows = normalized
        .clone()
        .count()
        .await
        .map_err(|e| ingest_error(path, e))?;

    let cleaned = normalized
        .filter(valid_trip_predicate())?
        .cache()
        .await
        .map_err(|e| ingest_error(path, e))?;
    let loaded_rows = cleaned.clone().count().await?;

    let report = IngestReport {
        total_rows,
        loaded_rows,
        dropped_rows: total_rows - loaded_rows,
    };
    if report.dropped_rows > 0 {
        warn!(
            "Dropped {} malformed rows out of {} from {}",
            report.dropped_rows,
            report.total_rows,
            path.display()
        );
    }
    info!(
        "Loaded {} trips from {} (distances in {})",
        report.loaded_rows,
        path.display(),
        options.distance_unit.as_str()
    );
    Ok((TripSet::with_plan(cleaned), report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_format_from_extension() {
        assert_eq!(
            SourceFormat::from_path(Path::new("trips.csv")).unwrap(),
            SourceFormat::Csv
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("trips.PARQUET")).unwrap(),
            SourceFormat::Parquet
        );
        assert!(matches!(
            SourceFormat::from_path(Path::new("trips.json")),
            Err(TripMetricsError::IngestError(_))
        ));
        assert!(SourceFormat::from_path(Path::new("trips")).is_err());
    }

    #[test]
    fn test_csv_header_handles_quotes_and_bom() {
        let path = std::env::temp_dir().join(format!(
            "trip_metrics_header_{}.csv",
            std::process::id()
        ));
        std::fs::write(&path, "\u{feff}pickup,\"zone\",\"note, extra\"\n1,2,3\n").unwrap();
        let names = read_csv_header(&path, b',').unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(names, vec!["pickup", "zone", "note, extra"]);
    }

    #[test]
    fn test_missing_file_is_ingest_error() {
        let err = read_csv_header(Path::new("does/not/exist.csv"), b',').unwrap_err();
        assert!(matches!(err, TripMetricsError::IngestError(_)));
    }
}
