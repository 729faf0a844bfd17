//! Update-policy resolution.

use skylink_objects::{EventKind, EventSet, Metadata, UpdateMode};

/// The scheduling decision derived from an object's metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdatePolicy {
    /// Periodic push period, or 0 to disable periodic pushes.
    pub period_ms: u32,
    /// Events that should trigger synchronization for the type.
    pub events: EventSet,
}

impl UpdatePolicy {
    /// Resolves an object's current metadata into its policy.
    ///
    /// Metaobjects additionally listen for remote-origin updates in every
    /// mode but `Never`, since an unpacked metaobject means the peer just
    /// changed the parent's policy.
    pub fn resolve(metadata: &Metadata, is_meta: bool) -> Self {
        let (period_ms, events) = match metadata.update_mode {
            UpdateMode::Periodic => (
                metadata.update_period_ms,
                EventSet::none()
                    .with(EventKind::ManualUpdated)
                    .with(EventKind::UpdateRequested),
            ),
            UpdateMode::OnChange => (
                0,
                EventSet::none()
                    .with(EventKind::AutoUpdated)
                    .with(EventKind::ManualUpdated)
                    .with(EventKind::UpdateRequested),
            ),
            UpdateMode::Manual => (
                0,
                EventSet::none()
                    .with(EventKind::ManualUpdated)
                    .with(EventKind::UpdateRequested),
            ),
            UpdateMode::Never => (0, EventSet::none()),
        };

        let events = if is_meta && metadata.update_mode != UpdateMode::Never {
            events.with(EventKind::Unpacked)
        } else {
            events
        };

        Self { period_ms, events }
    }
}
