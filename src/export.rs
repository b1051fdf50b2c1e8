//! ## Parquet export
//!
//! Writes cleaned trips to a Parquet file so they can be analysed offline or loaded back
//! with [`ColumnMapping::normalized`](crate::settings::ColumnMapping::normalized).

use crate::exceptions::TripMetricsResult;
use crate::model::{columns, TripSet};
use datafusion::logical_expr::col;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Writes the trips, ordered by pickup time, to `path`. Returns the number of rows written.
/// An existing file is overwritten.
pub(crate) async fn write_trips_parquet(trips: &TripSet, path: &Path) -> TripMetricsResult<usize> {
    let batches = trips
        .plan()
        .sort(vec![col(columns::PICKUP_AT).sort(true, false)])?
        .collect()
        .await?;
    let schema = batches
        .first()
        .map(|batch| batch.schema())
        .unwrap_or_else(|| Arc::clone(trips.frame().schema().inner()));

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    let mut rows = 0;
    for batch in &batches {
        writer.write(batch)?;
        rows += batch.num_rows();
    }
    writer.close()?;
    debug!("Wrote {} trips to {}", rows, path.display());
    Ok(rows)
}
