//! Binding Host
//!
//! The host owns one binding tree and is the public entry point of the
//! engine. It implements the four operations that keep the tree in sync
//! with the objects it observes:
//!
//! 1. **Data-context assignment.** A node that receives a new data context
//!    swaps its subscription, then cascades: every direct registration runs
//!    and every child is resynchronised from the new context.
//!
//! 2. **Property-change delivery.** A notification for property `P` runs the
//!    registrations on `P` (filtered if the change was our own write) and
//!    resynchronises the child observing `P`.
//!
//! 3. **Registration.** Binding a path walks or lazily creates one node per
//!    segment and stores the registration on the last one.
//!
//! 4. **Read and write.** Paths resolve from the root data context. Writes
//!    mark the target property so its echo notification is recognised.
//!
//! # Reentrancy
//!
//! Callbacks run synchronously and may call back into the host. The arena
//! is therefore never borrowed while a callback, a property accessor, or a
//! notifier runs: every cascade first snapshots the registrations and child
//! links it will visit, releases the borrow, and only then calls out.
//! Anything registered mid-cascade is picked up by the next one; anything
//! cancelled mid-cascade is skipped.
//!
//! # Failure Containment
//!
//! Each delivery runs under `catch_unwind`. A resolution error or a panic
//! becomes a [`CallbackFailure`] for the host's [`FailureSink`] and the
//! cascade continues.

use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use super::arena::NodeArena;
use super::handle::RegistrationHandle;
use super::node::{Deliver, NodeId, Registration, RegistrationId};
use super::path::PropertyPath;
use super::suppress::SuppressionGuard;
use crate::config::BindOptions;
use crate::error::{BindingError, CallbackFailure, FailureReason, Result};
use crate::observe::{FailureSink, TracingSink};
use crate::reactive::{ContextSubscription, FromValue, PropertyListener, Value};

/// Shared state behind a [`BindingHost`].
pub(crate) struct HostInner {
    this: Weak<HostInner>,
    arena: RefCell<NodeArena>,
    sink: Box<dyn FailureSink>,
}

/// Forwards an observed object's notifications to one node.
struct NodeListener {
    host: Weak<HostInner>,
    node: NodeId,
}

impl PropertyListener for NodeListener {
    fn property_changed(&self, name: &str) {
        if let Some(host) = self.host.upgrade() {
            host.property_changed(self.node, name);
        }
    }
}

impl HostInner {
    fn root(&self) -> NodeId {
        self.arena.borrow().root()
    }

    fn context_of(&self, node: NodeId) -> Value {
        self.arena
            .borrow()
            .get(node)
            .map(|n| n.data_context().clone())
            .unwrap_or_default()
    }

    /// Assign a node's data context and cascade.
    ///
    /// No-op if `value` is identical to the current context. This is also
    /// what stops a setter invoked from inside the resulting cascade from
    /// recursing forever.
    pub(crate) fn set_data_context(&self, node: NodeId, value: Value) {
        let previous = {
            let mut arena = self.arena.borrow_mut();
            let Some(n) = arena.get_mut(node) else {
                return;
            };
            if *n.data_context() == value {
                return;
            }
            n.replace_context(value.clone())
        };
        drop(previous);

        let listener = NodeListener {
            host: self.this.clone(),
            node,
        };
        if let Some(subscription) = ContextSubscription::attach(&value, listener) {
            tracing::debug!(node = node.raw(), context = %value.type_name(), "subscribed to data context");
            let stale = {
                let mut arena = self.arena.borrow_mut();
                match arena.get_mut(node) {
                    Some(n) => n.attach(subscription),
                    None => Some(subscription),
                }
            };
            drop(stale);
        }

        self.cascade(node);
    }

    /// Run every direct registration of `node`, then resync its children.
    fn cascade(&self, node: NodeId) {
        let (registrations, children) = {
            let arena = self.arena.borrow();
            let Some(n) = arena.get(node) else {
                return;
            };
            (n.all_registrations(), n.children())
        };

        tracing::trace!(
            node = node.raw(),
            registrations = registrations.len(),
            children = children.len(),
            "cascade"
        );

        for registration in &registrations {
            self.deliver(registration);
        }
        for (property, child) in children {
            let value = self.resolve_child(node, &property);
            self.sync_child(child, value);
        }
    }

    /// Bring `child` in line with its parent after the parent's context changed.
    ///
    /// A child that stays absent has nothing to cascade, yet its subscribers
    /// must still hear that their path now resolves to nothing, so every
    /// registration in its subtree is delivered once.
    fn sync_child(&self, child: NodeId, value: Value) {
        if value.is_none() {
            let still_absent = self
                .arena
                .borrow()
                .get(child)
                .is_some_and(|n| n.data_context().is_none());
            if still_absent {
                let registrations = self.arena.borrow().subtree_registrations(child);
                for registration in &registrations {
                    self.deliver(registration);
                }
                return;
            }
        }
        self.set_data_context(child, value);
    }

    /// Value of `property` on `node`'s context, absent if it cannot be read.
    fn resolve_child(&self, node: NodeId, property: &str) -> Value {
        let context = self.context_of(node);
        match context.property(property) {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(node = node.raw(), %err, "segment unresolvable, treating as absent");
                Value::None
            }
        }
    }

    /// Handle a notification from `node`'s data context.
    fn property_changed(&self, node: NodeId, property: &str) {
        let (registrations, child) = {
            let mut arena = self.arena.borrow_mut();
            let Some(n) = arena.get_mut(node) else {
                return;
            };
            let self_write = n.take_suppressed(property);
            (n.registrations_for(property, self_write), n.child(property))
        };

        tracing::trace!(
            node = node.raw(),
            property,
            registrations = registrations.len(),
            "property changed"
        );

        for registration in &registrations {
            self.deliver(registration);
        }
        if let Some(child) = child {
            let value = self.resolve_child(node, property);
            self.set_data_context(child, value);
        }
    }

    /// Invoke one registration, containing any failure.
    fn deliver(&self, registration: &Registration) {
        let live = registration.node.is_some_and(|node| {
            let arena = self.arena.borrow();
            let key = registration.path.segments().last().map_or("", |s| &**s);
            arena
                .get(node)
                .is_some_and(|n| n.has_registration(key, registration.id))
        });
        if !live {
            return;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (registration.deliver)()));
        let reason = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => FailureReason::Resolution(err),
            Err(payload) => FailureReason::Panicked(panic_message(payload.as_ref())),
        };
        self.sink.report(&CallbackFailure {
            path: registration.path.to_string(),
            reason,
        });
    }

    fn bind(&self, path: PropertyPath, deliver: Deliver, options: BindOptions) -> RegistrationHandle {
        let registration = Registration {
            id: RegistrationId::new(),
            path: path.clone(),
            deliver,
            always_trigger: options.always_trigger,
            node: None,
        };
        let root = self.root();
        let registration = self.bind_at(root, path.segments(), registration, options);

        tracing::debug!(path = %path, id = ?registration.id, "bound");

        RegistrationHandle::new(
            self.this.clone(),
            registration.node.unwrap_or(root),
            path.segments().last().cloned().unwrap_or_else(|| Rc::from("")),
            registration.id,
        )
    }

    /// Store `registration` below `node` along `segments`.
    ///
    /// Returns the stored registration with its owning node filled in.
    fn bind_at(
        &self,
        node: NodeId,
        segments: &[Rc<str>],
        mut registration: Registration,
        options: BindOptions,
    ) -> Registration {
        match segments {
            [head, rest @ ..] if !rest.is_empty() => {
                let child = self.child_or_create(node, head);
                let registration = self.bind_at(child, rest, registration, options);

                let nudge = !options.skip_immediate_invoke && {
                    let arena = self.arena.borrow();
                    let present = arena.get(node).is_some_and(|n| n.data_context().is_some());
                    let child_absent = arena.get(child).map_or(true, |n| n.data_context().is_none());
                    present && child_absent
                };
                if nudge {
                    self.deliver(&registration);
                }
                registration
            }
            _ => {
                let property = segments.first().cloned().unwrap_or_else(|| Rc::from(""));
                registration.node = Some(node);
                let present = {
                    let mut arena = self.arena.borrow_mut();
                    match arena.get_mut(node) {
                        Some(n) => {
                            n.add_registration(property, registration.clone());
                            n.data_context().is_some()
                        }
                        None => false,
                    }
                };
                if present && !options.skip_immediate_invoke {
                    self.deliver(&registration);
                }
                registration
            }
        }
    }

    fn child_or_create(&self, node: NodeId, property: &Rc<str>) -> NodeId {
        let existing = self.arena.borrow().get(node).and_then(|n| n.child(property));
        if let Some(child) = existing {
            return child;
        }

        let child = self.arena.borrow_mut().add_child(node, Rc::clone(property));
        tracing::debug!(parent = node.raw(), child = child.raw(), %property, "created binding node");

        let value = self.resolve_child(node, property);
        self.set_data_context(child, value);
        child
    }

    fn read(&self, path: &PropertyPath) -> Result<Value> {
        let mut current = self.context_of(self.root());
        for segment in path.segments() {
            if current.is_none() {
                return Ok(Value::None);
            }
            current = current.property(segment)?;
        }
        Ok(current)
    }

    fn write(&self, path: &PropertyPath, value: Value) -> Result<()> {
        let Some((property, prefix)) = path.split_last() else {
            return Err(BindingError::InvalidWriteTarget {
                path: String::new(),
                reason: "the data context itself cannot be written through a path",
            });
        };

        let mut target = self.context_of(self.root());
        for segment in prefix {
            if target.is_none() {
                break;
            }
            target = target.property(segment)?;
        }
        let object = match target {
            Value::Object(object) => object,
            Value::None => {
                return Err(BindingError::InvalidWriteTarget {
                    path: path.to_string(),
                    reason: "target object is absent",
                })
            }
            _ => {
                return Err(BindingError::InvalidWriteTarget {
                    path: path.to_string(),
                    reason: "target is not an object",
                })
            }
        };

        let observer = {
            let arena = self.arena.borrow();
            let expected = Value::Object(Rc::clone(&object));
            arena
                .find(prefix)
                .filter(|id| arena.get(*id).is_some_and(|n| *n.data_context() == expected))
        };

        let _guard = observer.map(|node| SuppressionGuard::enter(&self.arena, node, Rc::clone(property)));
        tracing::trace!(path = %path, suppressed = observer.is_some(), "write");
        object.set_property(property, value)
    }

    pub(crate) fn cancel(&self, node: NodeId, property: &str, id: RegistrationId) -> bool {
        let removed = self
            .arena
            .borrow_mut()
            .get_mut(node)
            .and_then(|n| n.remove_registration(property, id));
        let cancelled = removed.is_some();
        drop(removed);
        cancelled
    }

    pub(crate) fn is_registered(&self, node: NodeId, property: &str, id: RegistrationId) -> bool {
        self.arena
            .borrow()
            .get(node)
            .is_some_and(|n| n.has_registration(property, id))
    }

    fn unregister_all(&self) {
        let removed = self.arena.borrow_mut().clear();
        tracing::debug!(nodes = removed.len(), "unregistered all bindings");
        drop(removed);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Builder for [`BindingHost`].
pub struct HostBuilder {
    sink: Box<dyn FailureSink>,
}

impl HostBuilder {
    pub fn new() -> Self {
        Self {
            sink: Box::new(TracingSink),
        }
    }

    /// Where contained callback failures are reported. Defaults to [`TracingSink`].
    pub fn failure_sink(mut self, sink: impl FailureSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn build(self) -> BindingHost {
        let sink = self.sink;
        BindingHost {
            inner: Rc::new_cyclic(|this| HostInner {
                this: this.clone(),
                arena: RefCell::new(NodeArena::new()),
                sink,
            }),
        }
    }
}

impl Default for HostBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Root of a binding tree.
///
/// Cloning a `BindingHost` creates a new handle to the **same** tree. A
/// callback that needs the host should capture a [`WeakBindingHost`]
/// instead, since a strong clone stored inside the tree keeps it alive.
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use propbind_core::{BindingHost, DynamicObject, Value};
///
/// let teacher = DynamicObject::builder("Teacher").field("Name", "Ms. Frizzle").build();
/// let class = DynamicObject::builder("Class").field("Teacher", teacher).build();
/// let root = DynamicObject::builder("Root").field("Class", class).build();
///
/// let host = BindingHost::new();
/// host.set_data_context(root.clone());
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = seen.clone();
/// let _handle = host
///     .bind("Class.Teacher.Name", move |v| sink.borrow_mut().push(v))
///     .unwrap();
///
/// let substitute = DynamicObject::builder("Teacher").field("Name", "Mr. Keating").build();
/// let class2 = DynamicObject::builder("Class").field("Teacher", substitute).build();
/// root.set("Class", class2).unwrap();
///
/// assert_eq!(*seen.borrow(), vec![Value::from("Ms. Frizzle"), Value::from("Mr. Keating")]);
/// ```
#[derive(Clone)]
pub struct BindingHost {
    inner: Rc<HostInner>,
}

impl BindingHost {
    /// Create a host that reports callback failures through `tracing`.
    pub fn new() -> Self {
        HostBuilder::new().build()
    }

    pub fn builder() -> HostBuilder {
        HostBuilder::new()
    }

    /// Replace the root data context and cascade through the whole tree.
    pub fn set_data_context(&self, value: impl Into<Value>) {
        let root = self.inner.root();
        self.inner.set_data_context(root, value.into());
    }

    /// The root data context.
    pub fn data_context(&self) -> Value {
        self.inner.context_of(self.inner.root())
    }

    /// Bind `path` with default options.
    ///
    /// `callback` receives the value at the end of the path, or
    /// [`Value::None`] if some intermediate object is absent. It runs once
    /// immediately if the root data context is present.
    ///
    /// The registration lives as long as the returned handle. Keep it, or
    /// call [`RegistrationHandle::detach`] to tie the registration to the
    /// host instead; a bare `host.bind(..)?;` cancels it immediately.
    pub fn bind<F>(&self, path: &str, callback: F) -> Result<RegistrationHandle>
    where
        F: Fn(Value) + 'static,
    {
        self.bind_with(path, BindOptions::default(), callback)
    }

    pub fn bind_with<F>(&self, path: &str, options: BindOptions, callback: F) -> Result<RegistrationHandle>
    where
        F: Fn(Value) + 'static,
    {
        self.register(path, options, move |value| {
            callback(value);
            Ok(())
        })
    }

    /// Bind `path` and convert each delivered value to `T`.
    ///
    /// A value that does not convert is reported as a callback failure and
    /// the callback is skipped for that delivery.
    pub fn bind_as<T, F>(&self, path: &str, options: BindOptions, callback: F) -> Result<RegistrationHandle>
    where
        T: FromValue + 'static,
        F: Fn(T) + 'static,
    {
        let label = path.to_string();
        self.register(path, options, move |value| {
            callback(T::extract(value, &label)?);
            Ok(())
        })
    }

    fn register<F>(&self, path: &str, options: BindOptions, on_value: F) -> Result<RegistrationHandle>
    where
        F: Fn(Value) -> Result<()> + 'static,
    {
        let path = PropertyPath::parse(path)?;
        let host = Rc::downgrade(&self.inner);
        let read_path = path.clone();
        let deliver: Deliver = Rc::new(move || {
            let Some(host) = host.upgrade() else {
                return Ok(());
            };
            let value = host.read(&read_path)?;
            on_value(value)
        });
        Ok(self.inner.bind(path, deliver, options))
    }

    /// Resolve `path` against the current root data context.
    ///
    /// Absent intermediate objects yield [`Value::None`]; a name that does
    /// not exist on the object reached fails with `PropertyNotFound`.
    pub fn read_path(&self, path: &str) -> Result<Value> {
        self.inner.read(&PropertyPath::parse(path)?)
    }

    pub fn read_as<T: FromValue>(&self, path: &str) -> Result<T> {
        T::extract(self.read_path(path)?, path)
    }

    /// Write `value` at `path`.
    ///
    /// Registrations on the written property that were not bound with
    /// `always_trigger` do not hear the resulting notification.
    pub fn write_path(&self, path: &str, value: impl Into<Value>) -> Result<()> {
        self.inner.write(&PropertyPath::parse(path)?, value.into())
    }

    /// Drop every registration and node and detach from every observed object.
    ///
    /// The root data context is reset to absent without a cascade.
    pub fn unregister_all(&self) {
        self.inner.unregister_all();
    }

    /// Number of nodes in the tree, root included.
    pub fn node_count(&self) -> usize {
        self.inner.arena.borrow().node_count()
    }

    pub fn registration_count(&self) -> usize {
        self.inner.arena.borrow().registration_count()
    }

    pub fn downgrade(&self) -> WeakBindingHost {
        WeakBindingHost {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl Default for BindingHost {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BindingHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingHost")
            .field("data_context", &self.data_context())
            .field("node_count", &self.node_count())
            .field("registration_count", &self.registration_count())
            .finish()
    }
}

/// Non-owning handle to a [`BindingHost`].
#[derive(Clone)]
pub struct WeakBindingHost {
    inner: Weak<HostInner>,
}

impl WeakBindingHost {
    pub fn upgrade(&self) -> Option<BindingHost> {
        self.inner.upgrade().map(|inner| BindingHost { inner })
    }
}

impl fmt::Debug for WeakBindingHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakBindingHost")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}
