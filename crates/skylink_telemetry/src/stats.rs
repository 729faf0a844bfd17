//! Aggregate link statistics.

use crate::transport::LinkStats;

/// A point-in-time snapshot of telemetry statistics.
///
/// Combines the transport's byte/object counters with the engine's locally
/// tracked transmit errors and retries, the engine's share being folded
/// into `tx_errors`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelemetryStats {
    /// Total bytes transmitted.
    pub tx_bytes: u64,
    /// Total bytes received.
    pub rx_bytes: u64,
    /// Bytes of object payload transmitted.
    pub tx_object_bytes: u64,
    /// Bytes of object payload received.
    pub rx_object_bytes: u64,
    /// Objects transmitted.
    pub tx_objects: u64,
    /// Objects received.
    pub rx_objects: u64,
    /// Transmit errors: transport-detected plus engine-detected (queue
    /// overflows and exhausted transactions).
    pub tx_errors: u64,
    /// Receive errors detected by the transport.
    pub rx_errors: u64,
    /// Transaction retries issued by the engine.
    pub tx_retries: u64,
}

impl TelemetryStats {
    /// Merges transport counters with the engine's local counters.
    pub(crate) fn merge(link: LinkStats, tx_errors: u64, tx_retries: u64) -> Self {
        Self {
            tx_bytes: link.tx_bytes,
            rx_bytes: link.rx_bytes,
            tx_object_bytes: link.tx_object_bytes,
            rx_object_bytes: link.rx_object_bytes,
            tx_objects: link.tx_objects,
            rx_objects: link.rx_objects,
            tx_errors: link.tx_errors + tx_errors,
            rx_errors: link.rx_errors,
            tx_retries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_folds_local_errors_into_tx_errors() {
        let link = LinkStats {
            tx_bytes: 10,
            rx_bytes: 20,
            tx_errors: 2,
            rx_errors: 1,
            ..LinkStats::default()
        };

        let stats = TelemetryStats::merge(link, 3, 7);
        assert_eq!(stats.tx_bytes, 10);
        assert_eq!(stats.rx_bytes, 20);
        assert_eq!(stats.tx_errors, 5);
        assert_eq!(stats.rx_errors, 1);
        assert_eq!(stats.tx_retries, 7);
    }
}
