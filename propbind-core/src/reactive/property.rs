//! Capabilities the engine consumes from observed objects.
//!
//! The engine never inspects an object directly. It reads and writes named
//! properties through [`PropertyAccess`] and, when the object can announce
//! changes, attaches to its [`PropertyNotifier`].

use std::rc::Weak;

use super::subscriber::ListenerId;
use super::value::Value;
use crate::error::Result;

/// Read and write named properties on an object by string name.
pub trait PropertyAccess {
    /// Name of the object's runtime type, used in error messages.
    fn type_name(&self) -> &str;

    /// Read the current value of `name`.
    ///
    /// Fails with `PropertyNotFound` if the type has no such property.
    /// A property that exists but currently holds nothing returns
    /// [`Value::None`].
    fn get_property(&self, name: &str) -> Result<Value>;

    /// Write `value` to `name`.
    ///
    /// Fails with `PropertyNotFound` if the type has no such property, or
    /// `TypeMismatch` if the value is not acceptable for it.
    fn set_property(&self, name: &str, value: Value) -> Result<()>;

    /// The object's change notification capability, if it has one.
    fn notifier(&self) -> Option<&dyn PropertyNotifier> {
        None
    }
}

/// Receives "property X changed" announcements.
pub trait PropertyListener {
    fn property_changed(&self, name: &str);
}

/// An object that can announce named property changes.
///
/// Implementations must hold listeners weakly: a subscription is never the
/// reason a listener, or anything the listener refers to, stays alive.
pub trait PropertyNotifier {
    fn subscribe(&self, listener: Weak<dyn PropertyListener>) -> ListenerId;

    /// Stop notifying the listener. Unknown ids are ignored.
    fn unsubscribe(&self, id: ListenerId);
}
