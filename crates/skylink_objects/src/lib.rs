//! # SkyLink Objects
//!
//! Object model and object-store boundary for the SkyLink telemetry link.
//!
//! This crate provides:
//! - Object type identity and update-policy metadata
//! - The event vocabulary objects emit (unpacked, updated, requested, ...)
//! - The [`TelemetryObject`] and [`ObjectStore`] traits the engine talks to
//! - In-memory implementations for tests and embedders without a real store
//!
//! The synchronization engine itself lives in `skylink_telemetry`; it holds
//! only references into this crate and never owns object definitions or
//! per-instance data.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod event;
mod object;
mod store;
mod types;

pub use event::{EventKind, EventSet};
pub use object::{EventListener, MemoryObject, ObjectRef, TelemetryObject};
pub use store::{MemoryStore, ObjectStore, StoreListener};
pub use types::{Metadata, ObjectId, UpdateMode};
