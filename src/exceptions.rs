//! ## Custom Errors for Trip Metrics
//!
//! This module defines the error type shared by every part of the library.
//! It uses the `thiserror` crate to derive the `Error` trait.
//!
//! Two variants carry the domain failures the dashboard surfaces to its users:
//!
//! - `IngestError`: the trip source could not be read (bad path, unsupported format,
//!   missing required column). Malformed *rows* never raise it; they are skipped and counted.
//! - `InvalidArgument`: a query was called with a bad parameter (for example `k == 0`).
//!
//! The `TripMetricsResult` type alias is used by every fallible operation.
//!
//! ### Example
//!
//! ```rust
//! use trip_metrics::exceptions::{TripMetricsError, TripMetricsResult};
//!
//! fn top_k(k: usize) -> TripMetricsResult<usize> {
//!     if k == 0 {
//!         return Err(TripMetricsError::InvalidArgument("k must be positive".into()));
//!     }
//!     Ok(k)
//! }
//! ```

use thiserror::Error;

/// Errors specific to the Trip Metrics library.
#[derive(Debug, Error)]
pub enum TripMetricsError {
    /// Wraps underlying I/O errors.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Wraps errors from DataFusion.
    #[error("DataFusion error: {0}")]
    DataFusionError(#[from] datafusion::error::DataFusionError),

    /// Wraps errors from Arrow.
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    /// Wraps errors from Parquet.
    #[error("Parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    /// The trip source is unreadable or structurally malformed.
    #[error("Ingest error: {0}")]
    IngestError(String),

    /// A query parameter is out of its valid domain.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Indicates that the specified column does not exist in the DataFrame.
    #[error("Missing column: {0}")]
    MissingColumn(String),
}

/// A convenient result type for Trip Metrics operations.
pub type TripMetricsResult<T> = std::result::Result<T, TripMetricsError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_error() {
        let io_err = io::Error::new(io::ErrorKind::Other, "test io error");
        let err: TripMetricsError = io_err.into();
        let err_msg = format!("{}", err);
        assert!(err_msg.contains("I/O error:"));
        assert!(err_msg.contains("test io error"));
    }

    #[test]
    fn test_datafusion_error() {
        let df_err = datafusion::error::DataFusionError::Plan("test plan error".into());
        let err: TripMetricsError = df_err.into();
        let err_msg = format!("{}", err);
        assert!(err_msg.contains("DataFusion error:"));
        assert!(err_msg.contains("test plan error"));
    }

    #[test]
    fn test_arrow_error() {
        let arrow_err = arrow::error::ArrowError::ComputeError("test compute error".into());
        let err: TripMetricsError = arrow_err.into();
        assert!(format!("{}", err).contains("Arrow error:"));
    }

    #[test]
    fn test_parquet_error() {
        let parquet_err = parquet::errors::ParquetError::General("test parquet error".into());
        let err: TripMetricsError = parquet_err.into();
        let err_msg = format!("{}", err);
        assert!(err_msg.contains("Parquet error:"));
        assert!(err_msg.contains("test parquet error"));
    }

    #[test]
    fn test_ingest_error() {
        let err = TripMetricsError::IngestError("cannot open trips.csv".into());
        let err_msg = format!("{}", err);
        assert!(err_msg.contains("Ingest error:"));
        assert!(err_msg.contains("trips.csv"));
    }

    #[test]
    fn test_invalid_argument_error() {
        let err = TripMetricsError::InvalidArgument("k must be positive".into());
        assert_eq!(format!("{}", err), "Invalid argument: k must be positive");
    }

    #[test]
    fn test_missing_column_error() {
        let err = TripMetricsError::MissingColumn("fare".into());
        let err_msg = format!("{}", err);
        assert!(err_msg.contains("Missing column:"));
        assert!(err_msg.contains("fare"));
    }
}
