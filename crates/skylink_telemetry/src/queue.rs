//! Bounded dual-priority event queue.

use crate::error::{LinkError, LinkResult};
use skylink_objects::{EventKind, ObjectRef};
use std::collections::VecDeque;

/// One pending synchronization request.
#[derive(Clone)]
pub struct QueueEntry {
    /// Object instance the event fired on.
    pub obj: ObjectRef,
    /// What triggered the request.
    pub kind: EventKind,
    /// Whether the exchange covers all instances of the type.
    pub all_instances: bool,
}

impl QueueEntry {
    /// Creates a queue entry.
    pub fn new(obj: ObjectRef, kind: EventKind, all_instances: bool) -> Self {
        Self {
            obj,
            kind,
            all_instances,
        }
    }
}

/// Two bounded FIFOs of pending synchronization work.
///
/// The priority queue is drained to empty before the regular queue is
/// touched; within each queue order is strict FIFO. A push onto a full
/// queue never blocks and never grows the queue — the entry is rejected
/// and the caller handles the failure.
pub struct EventQueue {
    priority: VecDeque<QueueEntry>,
    regular: VecDeque<QueueEntry>,
    capacity: usize,
}

impl EventQueue {
    /// Creates a queue pair with the given per-queue capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            priority: VecDeque::with_capacity(capacity),
            regular: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an entry to the chosen queue.
    ///
    /// Returns [`LinkError::QueueFull`] if that queue is at capacity; the
    /// entry is dropped.
    pub fn push(&mut self, entry: QueueEntry, priority: bool) -> LinkResult<()> {
        let queue = if priority {
            &mut self.priority
        } else {
            &mut self.regular
        };
        if queue.len() >= self.capacity {
            return Err(LinkError::QueueFull {
                capacity: self.capacity,
            });
        }
        queue.push_back(entry);
        Ok(())
    }

    /// Removes the next entry: priority first, then regular, FIFO within
    /// each.
    pub fn pop(&mut self) -> Option<QueueEntry> {
        self.priority.pop_front().or_else(|| self.regular.pop_front())
    }

    /// Discards every regular-queue entry.
    pub fn clear_regular(&mut self) {
        self.regular.clear();
    }

    /// Number of pending priority entries.
    pub fn priority_depth(&self) -> usize {
        self.priority.len()
    }

    /// Number of pending regular entries.
    pub fn regular_depth(&self) -> usize {
        self.regular.len()
    }

    /// True if both queues are empty.
    pub fn is_empty(&self) -> bool {
        self.priority.is_empty() && self.regular.is_empty()
    }
}
