//! The object-store boundary.

use crate::object::{MemoryObject, ObjectRef};
use crate::types::ObjectId;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Callback invoked when the store registers a new object type or instance.
///
/// Invoked synchronously on the registering thread.
pub type StoreListener = Arc<dyn Fn(ObjectRef) + Send + Sync>;

/// The local object store the telemetry engine synchronizes against.
///
/// The store owns object definitions, per-instance data and metadata; the
/// engine only enumerates and subscribes through this trait.
pub trait ObjectStore: Send + Sync {
    /// One representative instance per registered object type.
    fn object_types(&self) -> Vec<ObjectRef>;

    /// Every instance of the given object type, registration order.
    fn instances_of(&self, id: ObjectId) -> Vec<ObjectRef>;

    /// Looks an object type up by display name.
    fn object_by_name(&self, name: &str) -> Option<ObjectRef>;

    /// Registers a callback for newly created object types.
    fn on_new_object(&self, listener: StoreListener);

    /// Registers a callback for newly created instances of known types.
    fn on_new_instance(&self, listener: StoreListener);
}

/// An in-memory object store.
///
/// Object types are kept in id order so enumeration is deterministic.
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<ObjectId, Vec<ObjectRef>>>,
    new_object_listeners: RwLock<Vec<StoreListener>>,
    new_instance_listeners: RwLock<Vec<StoreListener>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object to the store and notifies listeners.
    ///
    /// The first instance of an id registers a new object type; subsequent
    /// ones register as new instances of that type.
    pub fn add(&self, obj: Arc<MemoryObject>) {
        let obj = obj as ObjectRef;
        let is_new_type = {
            let mut objects = self.objects.write();
            let instances = objects.entry(obj.object_id()).or_default();
            instances.push(Arc::clone(&obj));
            instances.len() == 1
        };

        let listeners = if is_new_type {
            self.new_object_listeners.read().clone()
        } else {
            self.new_instance_listeners.read().clone()
        };
        for listener in listeners {
            listener(Arc::clone(&obj));
        }
    }
}

impl ObjectStore for MemoryStore {
    fn object_types(&self) -> Vec<ObjectRef> {
        self.objects
            .read()
            .values()
            .filter_map(|instances| instances.first().cloned())
            .collect()
    }

    fn instances_of(&self, id: ObjectId) -> Vec<ObjectRef> {
        self.objects.read().get(&id).cloned().unwrap_or_default()
    }

    fn object_by_name(&self, name: &str) -> Option<ObjectRef> {
        self.objects
            .read()
            .values()
            .filter_map(|instances| instances.first())
            .find(|obj| obj.name() == name)
            .cloned()
    }

    fn on_new_object(&self, listener: StoreListener) {
        self.new_object_listeners.write().push(listener);
    }

    fn on_new_instance(&self, listener: StoreListener) {
        self.new_instance_listeners.write().push(listener);
    }
}
