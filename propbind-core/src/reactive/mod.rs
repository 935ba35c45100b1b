//! Observed Objects
//!
//! This module defines what the binding engine needs from the objects it
//! observes, and nothing more. The engine treats an object as two
//! capabilities:
//!
//! - [`PropertyAccess`]: read and write a named property, failing with
//!   `PropertyNotFound` when the runtime type has no such member.
//! - [`PropertyNotifier`]: announce "property X changed" to listeners.
//!
//! # Leak Safety
//!
//! Notifiers hold their listeners weakly. The engine keeps each listener
//! alive through a [`ContextSubscription`] owned by the binding node that
//! observes the object, so subscriptions never extend the lifetime of the
//! host and the host never has to be torn down for the object to forget it.
//!
//! # Dynamic Objects
//!
//! [`DynamicObject`] is a ready-made implementation of both capabilities: a
//! property bag with a fixed schema, useful for tests, prototypes, and
//! view-models loaded from JSON via [`Value::from_json`].

mod object;
mod property;
mod subscriber;
mod value;

pub use object::{DynamicObject, DynamicObjectBuilder};
pub use property::{PropertyAccess, PropertyListener, PropertyNotifier};
pub use subscriber::{ContextSubscription, ListenerId};
pub use value::{FromValue, ObjectRef, Value};
