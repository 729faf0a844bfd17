//! Periodic update scheduler.
//!
//! Keeps one countdown per object type and computes the delay to the next
//! wake-up as the minimum remaining time across all periodic entries,
//! clamped to the configured tick bounds.
//!
//! A tick is split in two phases around event emission: [`Scheduler::advance`]
//! subtracts the interval the tick timer was armed with and collects the
//! entries that came due, and [`Scheduler::rearm_after`] charges the
//! wall-clock time emission took against every countdown before computing
//! the next delay, so slow emission does not cause runaway catch-up ticks.

use crate::config::jitter_fraction;
use skylink_objects::{ObjectId, ObjectRef};

/// Countdown state for one object type.
struct TimeEntry {
    obj: ObjectRef,
    period_ms: u32,
    remaining_ms: i64,
}

/// The per-type countdown table.
pub struct Scheduler {
    entries: Vec<TimeEntry>,
    time_to_next_tick_ms: u32,
    min_tick_ms: u32,
    max_tick_ms: u32,
}

impl Scheduler {
    /// Creates an empty scheduler with the given tick bounds.
    pub fn new(min_tick_ms: u32, max_tick_ms: u32) -> Self {
        Self {
            entries: Vec::new(),
            time_to_next_tick_ms: max_tick_ms,
            min_tick_ms,
            max_tick_ms,
        }
    }

    /// Adds an entry for the object's type if it has none yet. Idempotent
    /// per type: instances never create duplicate entries.
    pub fn register(&mut self, obj: &ObjectRef) {
        if self.contains(obj.object_id()) {
            return;
        }
        self.entries.push(TimeEntry {
            obj: obj.clone(),
            period_ms: 0,
            remaining_ms: 0,
        });
    }

    /// Sets the type's update period. A non-zero period arms the countdown
    /// at a random point within the first period so objects sharing a
    /// period do not bunch; zero makes the entry inert.
    pub fn set_period(&mut self, id: ObjectId, period_ms: u32) {
        for entry in &mut self.entries {
            if entry.obj.object_id() == id {
                entry.period_ms = period_ms;
                entry.remaining_ms = if period_ms > 0 {
                    (f64::from(period_ms) * jitter_fraction()) as i64
                } else {
                    0
                };
            }
        }
    }

    /// First tick phase: subtracts the interval the timer was armed with
    /// from every periodic countdown and returns the objects that came due,
    /// with their countdowns reset to `period − (overshoot mod period)` so
    /// firing drift does not accumulate.
    pub fn advance(&mut self) -> Vec<ObjectRef> {
        let interval = i64::from(self.time_to_next_tick_ms);
        let mut due = Vec::new();

        for entry in &mut self.entries {
            if entry.period_ms == 0 {
                continue;
            }
            entry.remaining_ms -= interval;
            if entry.remaining_ms <= 0 {
                let overshoot = -entry.remaining_ms;
                let period = i64::from(entry.period_ms);
                entry.remaining_ms = period - overshoot % period;
                due.push(entry.obj.clone());
            }
        }
        due
    }

    /// Second tick phase: charges the emission cost of this tick against
    /// every periodic countdown, then computes, stores and returns the next
    /// wake-up delay (minimum remaining time, clamped to the tick bounds).
    pub fn rearm_after(&mut self, emit_elapsed_ms: u32) -> u32 {
        let elapsed = i64::from(emit_elapsed_ms);
        let mut min_delay = i64::from(self.max_tick_ms);

        for entry in &mut self.entries {
            if entry.period_ms == 0 {
                continue;
            }
            entry.remaining_ms -= elapsed;
            if entry.remaining_ms < min_delay {
                min_delay = entry.remaining_ms;
            }
        }

        let next = min_delay.clamp(i64::from(self.min_tick_ms), i64::from(self.max_tick_ms)) as u32;
        self.time_to_next_tick_ms = next;
        next
    }

    /// Returns true if the type already has an entry.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.entries.iter().any(|e| e.obj.object_id() == id)
    }

    /// Number of scheduler entries (one per registered type).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no type is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
