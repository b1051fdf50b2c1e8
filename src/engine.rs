//! ## Trip Metrics Engine
//!
//! [`TripMetricsEngine`] is the session object the dashboard talks to. It is created by
//! loading a trip source (`load`), holds the cleaned trips in memory for the rest of the
//! session, and is torn down with `close` (or by dropping it).
//!
//! All operations are synchronous: each call runs one query pass on a current-thread Tokio
//! runtime owned by the engine. Because the engine blocks on its own runtime, it must not be
//! used from inside another async runtime's worker thread.
//!
//! ### Example
//!
//! ```rust,no_run
//! use trip_metrics::engine::TripMetricsEngine;
//! use trip_metrics::settings::IngestOptions;
//!
//! let engine = TripMetricsEngine::load("data/yellow_tripdata_2024-12.csv", IngestOptions::default())?;
//! println!("{} malformed rows skipped", engine.report().dropped_rows);
//!
//! let trips = engine.all_trips();
//! for day in engine.daily_aggregates(&trips)? {
//!     println!("{}: {} rides, ${:.2}", day.day, day.rides, day.revenue);
//! }
//! let top = engine.top_pickup_zones(&trips, 10)?;
//! engine.close();
//! # Ok::<(), trip_metrics::exceptions::TripMetricsError>(())
//! ```

use crate::exceptions::TripMetricsResult;
use crate::export::write_trips_parquet;
use crate::filters::{apply_filters, DateRange, TripFilter};
use crate::ingest::{load_trips, IngestReport};
use crate::metrics::daily::{daily_aggregates, rank_days, DailyAggregate, DayRanking};
use crate::metrics::distribution::{
    hourly_trends, passenger_breakdown, trip_length_distribution, HourlyTrend, PassengerCount,
    TripLengthCount,
};
use crate::metrics::highlights::{highlights, Highlights};
use crate::metrics::kpis::{summary_kpis, SummaryKpis};
use crate::metrics::payment::{payment_breakdown, PaymentBreakdown};
use crate::metrics::zones::{top_zones, ZoneKind, ZoneSummary};
use crate::model::{collect_trips, session_context, Trip, TripSet};
use crate::settings::{DistanceUnit, IngestOptions};
use chrono::NaiveDateTime;
use std::future::Future;
use std::path::Path;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info, warn};

/// An in-memory trip session.
pub struct TripMetricsEngine {
    runtime: Runtime,
    trips: TripSet,
    report: IngestReport,
    distance_unit: DistanceUnit,
}

fn current_thread_runtime() -> TripMetricsResult<Runtime> {
    Ok(Builder::new_current_thread().build()?)
}

impl TripMetricsEngine {
    /// Loads a CSV or Parquet trip source.
    ///
    /// Malformed rows are skipped and counted in [`Self::report`]. Returns `IngestError` if
    /// the source cannot be read or lacks a required column.
    pub fn load(path: impl AsRef<Path>, options: IngestOptions) -> TripMetricsResult<Self> {
        let path = path.as_ref();
        let runtime = current_thread_runtime()?;
        let ctx = session_context();
        let (trips, report) = runtime.block_on(load_trips(&ctx, path, &options))?;
        Ok(Self {
            runtime,
            trips,
            report,
            distance_unit: options.distance_unit,
        })
    }

    /// Loads a source laid out like the NYC TLC trip files.
    pub fn open(path: impl AsRef<Path>) -> TripMetricsResult<Self> {
        Self::load(path, IngestOptions::default())
    }

    /// Starts a session from records that are already in memory.
    ///
    /// Records that break the trip invariants (negative or non-finite fare, empty pickup
    /// zone) are dropped and counted like malformed source rows; negative or non-finite
    /// distances and tips are cleared.
    pub fn from_trips(trips: Vec<Trip>, distance_unit: DistanceUnit) -> TripMetricsResult<Self> {
        let total_rows = trips.len();
        let cleaned: Vec<Trip> = trips
            .into_iter()
            .filter(|t| t.fare.is_finite() && t.fare >= 0.0 && !t.pickup_zone.trim().is_empty())
            .map(|mut t| {
                t.distance = t.distance.filter(|d| d.is_finite() && *d >= 0.0);
                t.tip = t.tip.filter(|tip| tip.is_finite() && *tip >= 0.0);
                t
            })
            .collect();
        let report = IngestReport {
            total_rows,
            loaded_rows: cleaned.len(),
            dropped_rows: total_rows - cleaned.len(),
        };
        if report.dropped_rows > 0 {
            warn!("Dropped {} invalid trip records", report.dropped_rows);
        }
        Ok(Self {
            runtime: current_thread_runtime()?,
            trips: TripSet::from_trips(&cleaned)?,
            report,
            distance_unit,
        })
    }

    fn run<F: Future>(&self, query: F) -> F::Output {
        self.runtime.block_on(query)
    }

    /// Row counts from loading the source.
    pub fn report(&self) -> IngestReport {
        self.report
    }

    pub fn distance_unit(&self) -> DistanceUnit {
        self.distance_unit
    }

    /// Every loaded trip.
    pub fn all_trips(&self) -> TripSet {
        self.trips.clone()
    }

    /// Trips picked up between `start` and `end`, both inclusive.
    ///
    /// An empty result is not an error. Returns `InvalidArgument` if `start` is after `end`.
    pub fn filter_by_date_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> TripMetricsResult<TripSet> {
        DateRange::new(start, end)?.apply(&self.trips)
    }

    /// Applies `filters` in order to `trips`.
    pub fn apply_filters(
        &self,
        trips: &TripSet,
        filters: &[&dyn TripFilter],
    ) -> TripMetricsResult<TripSet> {
        apply_filters(trips, filters)
    }

    /// Number of trips in the set.
    pub fn count(&self, trips: &TripSet) -> TripMetricsResult<usize> {
        Ok(self.run(trips.plan().count())?)
    }

    /// The trips of the set as records, ordered by pickup time.
    pub fn trips(&self, trips: &TripSet) -> TripMetricsResult<Vec<Trip>> {
        self.run(collect_trips(trips))
    }

    /// Ride count, revenue and average fare per calendar day, ordered by day.
    pub fn daily_aggregates(&self, trips: &TripSet) -> TripMetricsResult<Vec<DailyAggregate>> {
        debug!("Computing daily aggregates");
        self.run(daily_aggregates(trips))
    }

    /// The `k` best days by revenue or rides, ties going to the earlier day.
    pub fn top_days(
        &self,
        trips: &TripSet,
        k: usize,
        ranking: DayRanking,
    ) -> TripMetricsResult<Vec<DailyAggregate>> {
        let days = self.daily_aggregates(trips)?;
        rank_days(&days, k, ranking)
    }

    /// Ride count and percentage of rides per payment method.
    pub fn payment_breakdown(&self, trips: &TripSet) -> TripMetricsResult<PaymentBreakdown> {
        debug!("Computing payment breakdown");
        self.run(payment_breakdown(trips))
    }

    /// The `k` pickup zones with the most rides. Returns `InvalidArgument` if `k` is zero.
    pub fn top_pickup_zones(
        &self,
        trips: &TripSet,
        k: usize,
    ) -> TripMetricsResult<Vec<ZoneSummary>> {
        self.run(top_zones(trips, ZoneKind::Pickup, k))
    }

    /// The `k` dropoff zones with the most rides. Returns `InvalidArgument` if `k` is zero.
    pub fn top_dropoff_zones(
        &self,
        trips: &TripSet,
        k: usize,
    ) -> TripMetricsResult<Vec<ZoneSummary>> {
        self.run(top_zones(trips, ZoneKind::Dropoff, k))
    }

    /// Total rides, total revenue and average distance; zeros for an empty set.
    pub fn summary_kpis(&self, trips: &TripSet) -> TripMetricsResult<SummaryKpis> {
        self.run(summary_kpis(trips))
    }

    pub fn hourly_trends(&self, trips: &TripSet) -> TripMetricsResult<Vec<HourlyTrend>> {
        self.run(hourly_trends(trips))
    }

    /// Rides per trip-length bucket, using the distance unit fixed at load time.
    pub fn trip_length_distribution(
        &self,
        trips: &TripSet,
    ) -> TripMetricsResult<Vec<TripLengthCount>> {
        self.run(trip_length_distribution(trips, self.distance_unit))
    }

    pub fn passenger_breakdown(&self, trips: &TripSet) -> TripMetricsResult<Vec<PassengerCount>> {
        self.run(passenger_breakdown(trips))
    }

    pub fn highlights(&self, trips: &TripSet) -> TripMetricsResult<Highlights> {
        self.run(highlights(trips))
    }

    /// Writes `trips` to a Parquet file and returns the number of rows written.
    pub fn export_parquet(
        &self,
        trips: &TripSet,
        path: impl AsRef<Path>,
    ) -> TripMetricsResult<usize> {
        self.run(write_trips_parquet(trips, path.as_ref()))
    }

    /// Ends the session and releases the in-memory trips.
    pub fn close(self) {}
}

impl Drop for TripMetricsEngine {
    fn drop(&mut self) {
        info!(
            "Closing trip session ({} trips discarded)",
            self.report.loaded_rows
        );
    }
}
