//! The object boundary the telemetry engine talks to.

use crate::event::{EventKind, EventSet};
use crate::types::{Metadata, ObjectId};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Shared handle to one object instance.
pub type ObjectRef = Arc<dyn TelemetryObject>;

/// Callback invoked when a subscribed event fires on an object.
///
/// Listeners are invoked synchronously by whoever raises the event, on the
/// raiser's thread.
pub type EventListener = Arc<dyn Fn(ObjectRef, EventKind) + Send + Sync>;

/// One synchronizable object instance as seen by the telemetry engine.
///
/// The engine never owns object data; it reads identity and metadata through
/// this trait, subscribes for event notifications, and reports transaction
/// outcomes back through it.
pub trait TelemetryObject: Send + Sync {
    /// Stable id of this object's type.
    fn object_id(&self) -> ObjectId;

    /// Display name of this object's type.
    fn name(&self) -> String;

    /// Current update-policy metadata. Re-read on every use; may change at
    /// any time.
    fn metadata(&self) -> Metadata;

    /// For a metaobject, the object whose policy it carries. `None` for
    /// ordinary objects.
    fn meta_parent(&self) -> Option<ObjectRef>;

    /// Current value of a named field, if the object has one.
    fn field_value(&self, field: &str) -> Option<String>;

    /// Registers the engine's event subscription, replacing any previous
    /// one. Passing [`EventSet::none`] detaches the engine from this object.
    fn connect(&self, events: EventSet, listener: EventListener);

    /// Reports the outcome of a transaction involving this object to
    /// whoever is awaiting it.
    ///
    /// Called while the engine lock is held; implementations must not call
    /// back into the engine synchronously.
    fn transaction_completed(&self, success: bool);

    /// Returns true if this object carries update-policy metadata for
    /// another object type.
    fn is_meta(&self) -> bool {
        self.meta_parent().is_some()
    }
}

/// An in-memory object for tests and embedders without a real store.
///
/// Events are raised with [`MemoryObject::raise`]; transaction outcomes are
/// recorded and can be inspected with [`MemoryObject::outcomes`].
pub struct MemoryObject {
    id: ObjectId,
    name: String,
    metadata: RwLock<Metadata>,
    parent: Option<ObjectRef>,
    fields: RwLock<HashMap<String, String>>,
    listener: RwLock<Option<(EventSet, EventListener)>>,
    outcomes: Mutex<Vec<bool>>,
    weak_self: Weak<MemoryObject>,
}

impl MemoryObject {
    /// Creates a new object with the given identity and metadata.
    pub fn new(id: ObjectId, name: impl Into<String>, metadata: Metadata) -> Arc<Self> {
        Self::build(id, name.into(), metadata, None)
    }

    /// Creates a metaobject carrying the policy for `parent`.
    pub fn new_meta(
        id: ObjectId,
        name: impl Into<String>,
        metadata: Metadata,
        parent: ObjectRef,
    ) -> Arc<Self> {
        Self::build(id, name.into(), metadata, Some(parent))
    }

    fn build(id: ObjectId, name: String, metadata: Metadata, parent: Option<ObjectRef>) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            id,
            name,
            metadata: RwLock::new(metadata),
            parent,
            fields: RwLock::new(HashMap::new()),
            listener: RwLock::new(None),
            outcomes: Mutex::new(Vec::new()),
            weak_self: weak.clone(),
        })
    }

    /// Replaces this object's metadata.
    pub fn set_metadata(&self, metadata: Metadata) {
        *self.metadata.write() = metadata;
    }

    /// Sets a named field's value.
    pub fn set_field(&self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.write().insert(field.into(), value.into());
    }

    /// Raises an event on this object, invoking the connected listener if it
    /// subscribed to `kind`.
    pub fn raise(&self, kind: EventKind) {
        let listener = {
            let slot = self.listener.read();
            match &*slot {
                Some((events, listener)) if events.contains(kind) => Some(Arc::clone(listener)),
                _ => None,
            }
        };
        if let (Some(listener), Some(this)) = (listener, self.weak_self.upgrade()) {
            listener(this as ObjectRef, kind);
        }
    }

    /// Returns the event set the engine is currently connected with.
    pub fn connected_events(&self) -> EventSet {
        self.listener
            .read()
            .as_ref()
            .map(|(events, _)| *events)
            .unwrap_or_else(EventSet::none)
    }

    /// Returns every transaction outcome reported so far, oldest first.
    pub fn outcomes(&self) -> Vec<bool> {
        self.outcomes.lock().clone()
    }
}

impl TelemetryObject for MemoryObject {
    fn object_id(&self) -> ObjectId {
        self.id
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn metadata(&self) -> Metadata {
        *self.metadata.read()
    }

    fn meta_parent(&self) -> Option<ObjectRef> {
        self.parent.clone()
    }

    fn field_value(&self, field: &str) -> Option<String> {
        self.fields.read().get(field).cloned()
    }

    fn connect(&self, events: EventSet, listener: EventListener) {
        *self.listener.write() = Some((events, listener));
    }

    fn transaction_completed(&self, success: bool) {
        self.outcomes.lock().push(success);
    }
}
