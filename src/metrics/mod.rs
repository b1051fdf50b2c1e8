//! # Trip Metrics
//!
//! The submodules contain the aggregations behind the dashboard widgets.
//!
//! Every aggregation is an async function that takes a [`TripSet`](crate::model::TripSet),
//! builds a DataFusion plan on top of it, collects the result and converts it into plain
//! Rust values. Errors are returned as `TripMetricsError` and results are wrapped in
//! `TripMetricsResult`.

pub mod daily;
pub mod distribution;
pub mod highlights;
pub mod kpis;
pub mod payment;
pub mod zones;

use crate::exceptions::{TripMetricsError, TripMetricsResult};
use crate::model::columns;
use datafusion::logical_expr::{col, lit, Case as DFCase, Expr};
use datafusion::scalar::ScalarValue;

/// Rejects a zero `k` for top-k style queries.
pub(crate) fn check_top_k(k: usize, what: &str) -> TripMetricsResult<()> {
    if k == 0 {
        return Err(TripMetricsError::InvalidArgument(format!(
            "k for {} must be positive, got 0",
            what
        )));
    }
    Ok(())
}

/// Tip as a percentage of the fare; null when the tip is missing or the fare is zero.
pub(crate) fn tip_pct_expr() -> Expr {
    Expr::Case(DFCase {
        expr: None,
        when_then_expr: vec![(
            Box::new(col(columns::FARE).gt(lit(0.0))),
            Box::new(col(columns::TIP) / col(columns::FARE) * lit(100.0)),
        )],
        else_expr: Some(Box::new(lit(ScalarValue::Float64(None)))),
    })
}

/// Share of `part` in `total` as a percentage, or zero when the total is zero.
pub(crate) fn percentage(part: f64, total: f64) -> f64 {
    if total > 0.0 {
        part / total * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_top_k() {
        assert!(check_top_k(1, "zones").is_ok());
        assert!(matches!(
            check_top_k(0, "zones"),
            Err(TripMetricsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_percentage_of_zero_total() {
        assert_eq!(percentage(3.0, 0.0), 0.0);
        assert_eq!(percentage(1.0, 4.0), 25.0);
    }
}
