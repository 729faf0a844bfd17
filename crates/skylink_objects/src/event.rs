//! Event vocabulary for object notifications.

/// A notification kind an object can raise toward the telemetry engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Object data was updated by unpacking a frame from the remote peer.
    Unpacked,
    /// Object data was updated by a local change to its structure.
    AutoUpdated,
    /// An update was generated manually by local code.
    ManualUpdated,
    /// Local code requested the object be pulled from the peer.
    UpdateRequested,
    /// The periodic scheduler decided the object is due for a push.
    ///
    /// Never part of a subscription set; synthesized by the engine itself.
    PeriodicPush,
}

impl EventKind {
    /// Returns true if this event asks the peer for data rather than
    /// offering it.
    #[must_use]
    pub const fn is_request(self) -> bool {
        matches!(self, EventKind::UpdateRequested)
    }
}

/// The set of event kinds a subscription is interested in.
///
/// A small closed value type rather than an integer mask; only the four
/// subscribable kinds are representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventSet {
    unpacked: bool,
    auto_updated: bool,
    manual_updated: bool,
    update_requested: bool,
}

impl EventSet {
    /// The empty set. Connecting with it detaches the subscriber.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            unpacked: false,
            auto_updated: false,
            manual_updated: false,
            update_requested: false,
        }
    }

    /// Adds an event kind to the set.
    ///
    /// [`EventKind::PeriodicPush`] is not subscribable and is ignored.
    #[must_use]
    pub const fn with(mut self, kind: EventKind) -> Self {
        match kind {
            EventKind::Unpacked => self.unpacked = true,
            EventKind::AutoUpdated => self.auto_updated = true,
            EventKind::ManualUpdated => self.manual_updated = true,
            EventKind::UpdateRequested => self.update_requested = true,
            EventKind::PeriodicPush => {}
        }
        self
    }

    /// Returns true if the set contains the given kind.
    #[must_use]
    pub const fn contains(self, kind: EventKind) -> bool {
        match kind {
            EventKind::Unpacked => self.unpacked,
            EventKind::AutoUpdated => self.auto_updated,
            EventKind::ManualUpdated => self.manual_updated,
            EventKind::UpdateRequested => self.update_requested,
            EventKind::PeriodicPush => false,
        }
    }

    /// Returns true if no kind is selected.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        !(self.unpacked || self.auto_updated || self.manual_updated || self.update_requested)
    }
}
