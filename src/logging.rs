//! ## Logging Configuration
//!
//! This module sets up logging automatically at program startup using the `ctor` crate.
//! Logging behavior is controlled by the `DEBUG_TRIP_METRICS` environment variable:
//!
//! - **Disabled** (default): If the variable is unset, empty, or explicitly set to `"0"` or `"false"`,
//!   no logging will be initialized.
//! - **Enabled**: Any other value enables logging with a maximum log level of `DEBUG`.
//!
//! ### Usage Example
//!
//! To see ingestion reports and per-query debug output, set the environment variable
//! before launching the dashboard:
//!
//! ```sh
//! export DEBUG_TRIP_METRICS=true
//! ```

use ctor::ctor;
use tracing::Level;

/// Name of the environment variable that switches debug logging on.
pub const DEBUG_ENV_VAR: &str = "DEBUG_TRIP_METRICS";

/// Returns true if the given value of [`DEBUG_ENV_VAR`] leaves logging off.
pub(crate) fn is_disabled(value: Option<&str>) -> bool {
    value.map_or(true, |v| v == "0" || v == "false" || v.is_empty())
}

#[ctor]
fn set_debug_level() {
    let value = std::env::var(DEBUG_ENV_VAR).ok();
    if !is_disabled(value.as_deref()) {
        // A host application may already own the global subscriber.
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::is_disabled;

    #[test]
    fn test_logging_switch() {
        assert!(is_disabled(None));
        assert!(is_disabled(Some("")));
        assert!(is_disabled(Some("0")));
        assert!(is_disabled(Some("false")));
        assert!(!is_disabled(Some("1")));
        assert!(!is_disabled(Some("true")));
    }
}
