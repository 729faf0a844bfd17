//! # SkyLink Telemetry
//!
//! Synchronization engine for a telemetry link between a local object store
//! and a remote flight controller.
//!
//! This crate provides:
//! - Update-policy resolution per object type (periodic / on-change /
//!   manual / never)
//! - A periodic scheduler with anti-bunching jitter and drift-free re-arming
//! - A bounded dual-priority event queue with a drop-and-report overflow
//!   policy
//! - An acked-transaction state machine with timeout and bounded retry
//! - Aggregate link statistics
//!
//! ## Architecture
//!
//! The [`Telemetry`] facade owns all engine state behind one exclusive lock.
//! Object-store notifications, object events, timer firings and transport
//! completion callbacks all funnel through it; the wire protocol below and
//! the object store above are reached only through the [`LinkTransport`]
//! and [`skylink_objects::ObjectStore`] seams.
//!
//! ## Key invariants
//!
//! - At most one transaction is in flight at any instant
//! - At most one scheduler entry exists per object type
//! - Enqueueing never blocks; a full queue drops the entry and reports
//!   failure to the originating object
//! - Callers always learn the outcome of a transaction they initiated,
//!   through the object's completion callback
//! - Timers are re-armed one-shots; cancelling one is idempotent and safe
//!   after it fired

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod error;
mod policy;
mod queue;
mod scheduler;
mod stats;
mod timer;
mod transport;

pub use config::TelemetryConfig;
pub use engine::Telemetry;
pub use error::{LinkError, LinkResult};
pub use policy::UpdatePolicy;
pub use queue::{EventQueue, QueueEntry};
pub use scheduler::Scheduler;
pub use stats::TelemetryStats;
pub use timer::{
    ManualTimer, ManualTimers, ThreadTimer, ThreadTimers, Timer, TimerCallback, TimerFactory,
};
pub use transport::{LinkStats, LinkTransport, MockTransport, SentFrame};
