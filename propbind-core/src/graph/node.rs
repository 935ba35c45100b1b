//! Binding Nodes
//!
//! One node exists per distinct path prefix that some binding traverses.
//! A node observes a single data context and owns:
//!
//! - the leaf registrations keyed by the property they watch
//! - links to child nodes keyed by the property whose value they observe
//! - the names whose next change notification is self-inflicted
//!
//! Nodes hold no back-pointers. Everything that needs to find a node again
//! (listeners, registration handles) stores its [`NodeId`].

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use super::path::PropertyPath;
use crate::error::Result;
use crate::reactive::{ContextSubscription, Value};

/// Unique identifier for a node in the binding tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for one registration.
///
/// Ids are handed out in increasing order, so sorting by id recovers
/// registration order across properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegistrationId(u64);

impl RegistrationId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for RegistrationId {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads the bound path from the root and hands the result to the caller.
pub(crate) type Deliver = Rc<dyn Fn() -> Result<()>>;

/// One (callback, override flag) pair bound to a path.
#[derive(Clone)]
pub(crate) struct Registration {
    pub id: RegistrationId,
    /// Full path from the root, for failure reports.
    pub path: PropertyPath,
    pub deliver: Deliver,
    pub always_trigger: bool,
    /// The node whose direct subscriptions hold this registration.
    pub node: Option<NodeId>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("always_trigger", &self.always_trigger)
            .field("node", &self.node)
            .finish()
    }
}

/// A node in the binding tree.
#[derive(Debug)]
pub(crate) struct BindingNode {
    id: NodeId,

    /// The object currently observed. Not owned beyond the subscription.
    data_context: Value,

    /// Present while `data_context` is an object that can notify.
    subscription: Option<ContextSubscription>,

    /// Leaf registrations by watched property, in registration order.
    /// The empty name holds bindings to the data context itself.
    direct: IndexMap<Rc<str>, Vec<Registration>>,

    /// Child nodes by the property whose value they observe.
    children: IndexMap<Rc<str>, NodeId>,

    /// Names whose next change notification came from our own write.
    suppress_once: HashSet<Rc<str>>,
}

impl BindingNode {
    pub fn new() -> Self {
        Self::with_id(NodeId::new())
    }

    pub fn with_id(id: NodeId) -> Self {
        Self {
            id,
            data_context: Value::None,
            subscription: None,
            direct: IndexMap::new(),
            children: IndexMap::new(),
            suppress_once: HashSet::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn data_context(&self) -> &Value {
        &self.data_context
    }

    /// Store a new data context, returning the old subscription.
    ///
    /// The caller drops the returned subscription once it no longer holds
    /// the arena borrow, since dropping it calls into the notifier.
    #[must_use]
    pub fn replace_context(&mut self, value: Value) -> Option<ContextSubscription> {
        self.data_context = value;
        self.subscription.take()
    }

    /// Install the subscription for the current data context.
    #[must_use]
    pub fn attach(&mut self, subscription: ContextSubscription) -> Option<ContextSubscription> {
        self.subscription.replace(subscription)
    }

    #[cfg(test)]
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn add_registration(&mut self, property: Rc<str>, registration: Registration) {
        self.direct.entry(property).or_default().push(registration);
    }

    /// Remove exactly one registration. Empty lists are dropped.
    #[must_use]
    pub fn remove_registration(&mut self, property: &str, id: RegistrationId) -> Option<Registration> {
        let list = self.direct.get_mut(property)?;
        let index = list.iter().position(|r| r.id == id)?;
        let removed = list.remove(index);
        if list.is_empty() {
            self.direct.shift_remove(property);
        }
        Some(removed)
    }

    pub fn has_registration(&self, property: &str, id: RegistrationId) -> bool {
        self.direct
            .get(property)
            .is_some_and(|list| list.iter().any(|r| r.id == id))
    }

    /// Snapshot of every direct registration, in registration order.
    pub fn all_registrations(&self) -> Vec<Registration> {
        let mut all: Vec<Registration> = self.direct.values().flatten().cloned().collect();
        all.sort_by_key(|r| r.id);
        all
    }

    /// Snapshot of the registrations that should run for a change of `property`.
    ///
    /// A self-inflicted change only reaches registrations that asked for it.
    pub fn registrations_for(&self, property: &str, self_write: bool) -> Vec<Registration> {
        self.direct
            .get(property)
            .map(|list| {
                list.iter()
                    .filter(|r| !self_write || r.always_trigger)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn registration_count(&self) -> usize {
        self.direct.values().map(Vec::len).sum()
    }

    pub fn child(&self, property: &str) -> Option<NodeId> {
        self.children.get(property).copied()
    }

    pub fn insert_child(&mut self, property: Rc<str>, child: NodeId) {
        self.children.insert(property, child);
    }

    /// Snapshot of the child table.
    pub fn children(&self) -> Vec<(Rc<str>, NodeId)> {
        self.children
            .iter()
            .map(|(name, id)| (Rc::clone(name), *id))
            .collect()
    }

    /// Mark the next change of `property` as self-inflicted.
    pub fn suppress(&mut self, property: Rc<str>) {
        self.suppress_once.insert(property);
    }

    /// Consume the mark for `property`, reporting whether it was set.
    pub fn take_suppressed(&mut self, property: &str) -> bool {
        self.suppress_once.remove(property)
    }

    #[cfg(test)]
    pub fn is_suppressed(&self, property: &str) -> bool {
        self.suppress_once.contains(property)
    }
}

impl Default for BindingNode {
    fn default() -> Self {
        Self::new()
    }
}
