//! Wire-protocol transport seam.

use crate::error::{LinkError, LinkResult};
use parking_lot::Mutex;
use skylink_objects::{ObjectId, ObjectRef};
use std::sync::atomic::{AtomicBool, Ordering};

/// Byte and object counters reported by the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Total bytes transmitted, framing included.
    pub tx_bytes: u64,
    /// Total bytes received, framing included.
    pub rx_bytes: u64,
    /// Bytes of object payload transmitted.
    pub tx_object_bytes: u64,
    /// Bytes of object payload received.
    pub rx_object_bytes: u64,
    /// Objects transmitted.
    pub tx_objects: u64,
    /// Objects received.
    pub rx_objects: u64,
    /// Transmit errors detected by the transport.
    pub tx_errors: u64,
    /// Receive errors detected by the transport.
    pub rx_errors: u64,
}

/// The lower wire protocol the engine sends through.
///
/// Sends are fire-and-forget from the engine's perspective: completion of an
/// exchange that expects a reply is reported later through the engine's
/// [`transaction_completed`](crate::Telemetry::transaction_completed) entry
/// point.
pub trait LinkTransport: Send + Sync {
    /// Serializes and sends an object to the peer.
    fn send_object(&self, obj: &ObjectRef, acked: bool, all_instances: bool) -> LinkResult<()>;

    /// Sends a request for the peer's copy of an object.
    fn send_object_request(&self, obj: &ObjectRef, all_instances: bool) -> LinkResult<()>;

    /// Tells the transport to release any wait state for the outstanding
    /// transaction. Called after the retry budget is exhausted.
    fn cancel_transaction(&self);

    /// Returns the transport's counters.
    fn stats(&self) -> LinkStats;

    /// Resets the transport's counters.
    fn reset_stats(&self);
}

/// One frame recorded by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentFrame {
    /// An object push.
    Object {
        /// Object type pushed.
        id: ObjectId,
        /// Whether an acknowledgment was requested.
        acked: bool,
        /// Whether all instances were included.
        all_instances: bool,
    },
    /// An object pull request.
    Request {
        /// Object type requested.
        id: ObjectId,
        /// Whether all instances were requested.
        all_instances: bool,
    },
    /// A transaction cancellation.
    Cancel,
}

/// A transport that records frames instead of sending them.
#[derive(Default)]
pub struct MockTransport {
    frames: Mutex<Vec<SentFrame>>,
    stats: Mutex<LinkStats>,
    fail_sends: AtomicBool,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent send return a transport error.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Replaces the counters the mock reports.
    pub fn set_stats(&self, stats: LinkStats) {
        *self.stats.lock() = stats;
    }

    /// Every frame sent so far, oldest first.
    pub fn frames(&self) -> Vec<SentFrame> {
        self.frames.lock().clone()
    }

    /// Drops the recorded frames.
    pub fn clear_frames(&self) {
        self.frames.lock().clear();
    }

    fn record(&self, frame: SentFrame) -> LinkResult<()> {
        if self.fail_sends.load(Ordering::SeqCst) && frame != SentFrame::Cancel {
            return Err(LinkError::transport_retryable("mock send failure"));
        }
        self.frames.lock().push(frame);
        Ok(())
    }
}

impl LinkTransport for MockTransport {
    fn send_object(&self, obj: &ObjectRef, acked: bool, all_instances: bool) -> LinkResult<()> {
        self.record(SentFrame::Object {
            id: obj.object_id(),
            acked,
            all_instances,
        })
    }

    fn send_object_request(&self, obj: &ObjectRef, all_instances: bool) -> LinkResult<()> {
        self.record(SentFrame::Request {
            id: obj.object_id(),
            all_instances,
        })
    }

    fn cancel_transaction(&self) {
        let _ = self.record(SentFrame::Cancel);
    }

    fn stats(&self) -> LinkStats {
        *self.stats.lock()
    }

    fn reset_stats(&self) {
        *self.stats.lock() = LinkStats::default();
    }
}
