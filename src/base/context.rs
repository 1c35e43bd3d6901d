//! Request-scoped context.
//!
//! A small type-keyed map carried on each request's metadata. Layers use it
//! to communicate out-of-band settings down the request path; the blocking
//! adapter injects its execution-strategy override here so downstream
//! offloading decisions stay consistent with the adapter's configuration.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

/// Type-keyed context map attached to request metadata.
///
/// Each entry is keyed by its Rust type; storing a second value of the same
/// type replaces the first. Mutation happens on the request path only, so no
/// internal synchronization is needed.
#[derive(Default)]
pub struct RequestContext {
    entries: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any existing entry of the same type.
    pub fn put<T: Any + Send + Sync>(&mut self, value: T) {
        self.entries.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Insert a value only if no entry of this type exists yet.
    ///
    /// Returns `true` when the value was inserted.
    pub fn put_if_absent<T: Any + Send + Sync>(&mut self, value: T) -> bool {
        match self.entries.entry(TypeId::of::<T>()) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(Box::new(value));
                true
            }
        }
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.entries.get(&TypeId::of::<T>()).and_then(|v| v.downcast_ref())
    }

    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext").field("entries", &self.entries.len()).finish()
    }
}
