//! Leak-safe subscriptions to an object's change notifications.
//!
//! A [`ContextSubscription`] is the only strong owner of the listener it
//! registers. The notifier receives a `Weak`, so neither side keeps the other
//! alive:
//!
//! - dropping the subscription unsubscribes and deactivates the listener
//! - dropping the notifier's owner just stops notifications
//! - a notifier that outlives the subscription finds a dead `Weak` and skips it

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use super::property::PropertyListener;
use super::value::{ObjectRef, Value};

/// Unique identifier for a listener registered with a notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Generate a new unique listener ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps a listener so it can be switched off before the notifier forgets it.
///
/// A notifier snapshots its listeners before delivering, so a listener that
/// unsubscribes mid-delivery may still be called once. The gate turns that
/// late call into a no-op.
struct Gate {
    active: Cell<bool>,
    inner: Box<dyn PropertyListener>,
}

impl PropertyListener for Gate {
    fn property_changed(&self, name: &str) {
        if self.active.get() {
            self.inner.property_changed(name);
        }
    }
}

/// An active subscription to one object's change notifications.
///
/// Dropping it unsubscribes.
pub struct ContextSubscription {
    target: ObjectRef,
    id: ListenerId,
    gate: Rc<Gate>,
}

impl ContextSubscription {
    /// Subscribe `listener` to `target` if it is an object with a notifier.
    ///
    /// Returns `None` for primitives, `None` and non-notifying objects.
    pub fn attach<L>(target: &Value, listener: L) -> Option<Self>
    where
        L: PropertyListener + 'static,
    {
        let object = target.as_object()?;
        let notifier = object.notifier()?;

        let gate = Rc::new(Gate {
            active: Cell::new(true),
            inner: Box::new(listener),
        });
        let weak: Weak<dyn PropertyListener> = Rc::downgrade(&gate) as Weak<Gate>;
        let id = notifier.subscribe(weak);

        Some(Self {
            target: Rc::clone(object),
            id,
            gate,
        })
    }

    pub fn is_active(&self) -> bool {
        self.gate.active.get()
    }
}

impl Drop for ContextSubscription {
    fn drop(&mut self) {
        self.gate.active.set(false);
        if let Some(notifier) = self.target.notifier() {
            notifier.unsubscribe(self.id);
        }
    }
}

impl fmt::Debug for ContextSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextSubscription")
            .field("target", &self.target.type_name())
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
