//! A schema-fixed property bag with change notification.
//!
//! [`DynamicObject`] is the reference implementation of both capabilities
//! the engine consumes. Its field names are fixed when it is built, so
//! reading or writing an unknown name fails the same way a missing member
//! on a real model type would.
//!
//! # Invariants
//!
//! 1. Writing a value identical to the current one does not notify.
//! 2. Listeners are notified in subscription order, from a snapshot taken
//!    before the first call, with no internal borrow held.
//! 3. Listeners are held weakly; dead entries are pruned on every notify.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::property::{PropertyAccess, PropertyListener, PropertyNotifier};
use super::subscriber::ListenerId;
use super::value::Value;
use crate::error::{BindingError, Result};

type ListenerEntry = (ListenerId, Weak<dyn PropertyListener>);

/// An observable object with a fixed set of named fields.
pub struct DynamicObject {
    type_name: String,
    fields: RefCell<IndexMap<String, Value>>,
    listeners: RefCell<Vec<ListenerEntry>>,
}

/// Builder for [`DynamicObject`].
#[derive(Debug)]
pub struct DynamicObjectBuilder {
    type_name: String,
    fields: IndexMap<String, Value>,
}

impl DynamicObjectBuilder {
    /// Declare a field with its initial value.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> Rc<DynamicObject> {
        Rc::new(DynamicObject {
            type_name: self.type_name,
            fields: RefCell::new(self.fields),
            listeners: RefCell::new(Vec::new()),
        })
    }
}

impl DynamicObject {
    pub fn builder(type_name: impl Into<String>) -> DynamicObjectBuilder {
        DynamicObjectBuilder {
            type_name: type_name.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Result<Value> {
        self.fields
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| BindingError::not_found(&self.type_name, name))
    }

    /// Write a field and notify listeners if the value changed.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        {
            let mut fields = self.fields.borrow_mut();
            let slot = fields
                .get_mut(name)
                .ok_or_else(|| BindingError::not_found(&self.type_name, name))?;
            if *slot == value {
                return Ok(());
            }
            *slot = value;
        }
        self.notify(name);
        Ok(())
    }

    /// Field names in declaration order.
    pub fn property_names(&self) -> Vec<String> {
        self.fields.borrow().keys().cloned().collect()
    }

    /// Number of live listeners. Prunes dead ones.
    pub fn listener_count(&self) -> usize {
        let mut listeners = self.listeners.borrow_mut();
        listeners.retain(|(_, weak)| weak.strong_count() > 0);
        listeners.len()
    }

    /// Announce that `name` changed.
    ///
    /// Called by [`set`](Self::set); call it directly after mutating state
    /// the object exposes indirectly.
    pub fn notify(&self, name: &str) {
        let live: Vec<Rc<dyn PropertyListener>> = {
            let mut listeners = self.listeners.borrow_mut();
            listeners.retain(|(_, weak)| weak.strong_count() > 0);
            listeners.iter().filter_map(|(_, weak)| weak.upgrade()).collect()
        };

        for listener in &live {
            listener.property_changed(name);
        }
    }
}

impl PropertyAccess for DynamicObject {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn get_property(&self, name: &str) -> Result<Value> {
        self.get(name)
    }

    fn set_property(&self, name: &str, value: Value) -> Result<()> {
        self.set(name, value)
    }

    fn notifier(&self) -> Option<&dyn PropertyNotifier> {
        Some(self)
    }
}

impl PropertyNotifier for DynamicObject {
    fn subscribe(&self, listener: Weak<dyn PropertyListener>) -> ListenerId {
        let id = ListenerId::new();
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|(other, _)| *other != id);
    }
}

impl fmt::Debug for DynamicObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicObject")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields.borrow())
            .field("listener_count", &self.listeners.borrow().len())
            .finish()
    }
}
