//! Configuration for the telemetry engine.

use std::time::Duration;

/// Configuration for one telemetry link.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// How long to wait for a reply before retrying a transaction.
    pub transaction_timeout: Duration,
    /// How many times a timed-out transaction is resent before failing.
    pub max_retries: u32,
    /// Capacity of each of the two event queues.
    pub queue_depth: usize,
    /// Upper bound on the scheduler re-arm delay; also the idle tick rate.
    pub max_tick_interval_ms: u32,
    /// Lower bound on the scheduler re-arm delay.
    pub min_tick_interval_ms: u32,
    /// Name of the connection-status sentinel object.
    pub status_object: String,
    /// Field of the sentinel object holding the link status.
    pub status_field: String,
    /// Field value that marks the link as established.
    pub connected_value: String,
}

impl TelemetryConfig {
    /// Creates a configuration with the standard link constants.
    pub fn new() -> Self {
        Self {
            transaction_timeout: Duration::from_millis(250),
            max_retries: 2,
            queue_depth: 20,
            max_tick_interval_ms: 1000,
            min_tick_interval_ms: 1,
            status_object: "LinkStatus".into(),
            status_field: "Status".into(),
            connected_value: "Connected".into(),
        }
    }

    /// Sets the transaction timeout.
    pub fn with_transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = timeout;
        self
    }

    /// Sets the retry budget.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the event queue capacity.
    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth;
        self
    }

    /// Sets the scheduler tick interval bounds.
    pub fn with_tick_bounds(mut self, min_ms: u32, max_ms: u32) -> Self {
        self.min_tick_interval_ms = min_ms;
        self.max_tick_interval_ms = max_ms;
        self
    }

    /// Sets the connection-status sentinel: object name, field, and the
    /// value that marks the link as established.
    pub fn with_status_sentinel(
        mut self,
        object: impl Into<String>,
        field: impl Into<String>,
        connected: impl Into<String>,
    ) -> Self {
        self.status_object = object.into();
        self.status_field = field.into();
        self.connected_value = connected.into();
        self
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Fraction in `[0, 1)` drawn from the system clock, used to desynchronize
/// periodic objects sharing a period (no external RNG dependency).
pub(crate) fn jitter_fraction() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_constants() {
        let config = TelemetryConfig::new();
        assert_eq!(config.transaction_timeout, Duration::from_millis(250));
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.queue_depth, 20);
        assert_eq!(config.max_tick_interval_ms, 1000);
        assert_eq!(config.min_tick_interval_ms, 1);
        assert_eq!(config.status_object, "LinkStatus");
    }

    #[test]
    fn builder_overrides() {
        let config = TelemetryConfig::new()
            .with_transaction_timeout(Duration::from_millis(500))
            .with_max_retries(5)
            .with_queue_depth(8)
            .with_tick_bounds(10, 2000)
            .with_status_sentinel("GroundStats", "Link", "Up");

        assert_eq!(config.transaction_timeout, Duration::from_millis(500));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.queue_depth, 8);
        assert_eq!(config.min_tick_interval_ms, 10);
        assert_eq!(config.max_tick_interval_ms, 2000);
        assert_eq!(config.status_object, "GroundStats");
        assert_eq!(config.status_field, "Link");
        assert_eq!(config.connected_value, "Up");
    }

    #[test]
    fn jitter_is_a_fraction() {
        for _ in 0..100 {
            let j = jitter_fraction();
            assert!((0.0..1.0).contains(&j));
        }
    }
}
