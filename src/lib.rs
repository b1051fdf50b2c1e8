//! # Trip Metrics
//!
//! The data layer of an NYC taxi and rideshare analytics dashboard, built on
//! Apache DataFusion.
//!
//! A [`TripMetricsEngine`](engine::TripMetricsEngine) loads a CSV or Parquet sample of trip
//! records into memory, skipping and counting malformed rows, and answers the queries behind
//! the dashboard widgets: daily ride counts and revenue, payment-method mix, zone
//! leaderboards, headline KPIs, hourly and trip-length distributions.
//!
//! - [`engine`]: the session object and its synchronous query API.
//! - [`ingest`]: reading and cleaning trip sources.
//! - [`filters`]: composable trip filters (date range, payment method, pickup zone).
//! - [`metrics`]: the aggregations, as async functions over a [`TripSet`](model::TripSet).
//! - [`model`]: trip records and the normalized trip table.
//! - [`settings`]: ingestion options and source column mapping.
//! - [`exceptions`]: the error type.

pub mod engine;
pub mod exceptions;
mod export;
pub mod filters;
pub mod ingest;
mod logging;
pub mod metrics;
pub mod model;
pub mod settings;

pub use engine::TripMetricsEngine;
pub use exceptions::{TripMetricsError, TripMetricsResult};
pub use model::{PaymentMethod, Trip, TripSet};
