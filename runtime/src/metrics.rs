//! Metric names and descriptions for the registry.
//!
//! The registry records through the `metrics` facade. Install any recorder
//! (Prometheus exporter, statsd, a test recorder) in the application and call
//! [`register_metrics`] once to attach descriptions.

use metrics::{describe_counter, describe_histogram};

/// Actions applied to a store's reducer
pub const ACTIONS_TOTAL: &str = "registry.actions.total";

/// Controls run for a yielded action
pub const CONTROLS_EXECUTED: &str = "registry.controls.executed";

/// Controls whose future resolved to an error
pub const CONTROLS_FAILED: &str = "registry.controls.failed";

/// Time spent inside a store's reducer
pub const REDUCER_DURATION_SECONDS: &str = "registry.reducer.duration_seconds";

/// Resolver routines started
pub const RESOLVERS_STARTED: &str = "registry.resolvers.started";

/// Describe every registry metric to the installed recorder.
pub fn register_metrics() {
    describe_counter!(ACTIONS_TOTAL, "Total number of actions applied to store reducers");
    describe_counter!(CONTROLS_EXECUTED, "Total number of controls executed");
    describe_counter!(CONTROLS_FAILED, "Total number of controls that returned an error");
    describe_histogram!(
        REDUCER_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Time taken by reducers to apply an action"
    );
    describe_counter!(RESOLVERS_STARTED, "Total number of resolver routines started");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describing_without_recorder_is_harmless() {
        register_metrics();
        register_metrics();
    }

    #[test]
    fn names_share_prefix() {
        for name in [
            ACTIONS_TOTAL,
            CONTROLS_EXECUTED,
            CONTROLS_FAILED,
            REDUCER_DURATION_SECONDS,
            RESOLVERS_STARTED,
        ] {
            assert!(name.starts_with("registry."), "{name}");
        }
    }
}
