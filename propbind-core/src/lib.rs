//! Propbind Core
//!
//! This crate provides a reactive property-binding engine. Subscribers
//! register interest in dotted property paths such as `Class.Teacher.Name`
//! relative to a root data context, and are called with the current value
//! whenever anything along that path changes:
//!
//! - the root data context is replaced
//! - any intermediate object is replaced
//! - the leaf property changes
//!
//! Objects only need to expose named properties and announce changes; see
//! [`reactive`] for the capabilities and a ready-made [`DynamicObject`].
//!
//! # Architecture
//!
//! - `reactive`: observed-object capabilities, values, and subscriptions
//! - `graph`: the binding tree and the [`BindingHost`] that drives it
//! - `config`: per-registration [`BindOptions`]
//! - `observe`: where contained callback failures are reported
//! - `error`: the crate's error types
//!
//! # Example
//!
//! ```rust,ignore
//! use propbind_core::{BindingHost, DynamicObject};
//!
//! let class = DynamicObject::builder("Class").field("Name", "Spanish").build();
//! let root = DynamicObject::builder("Root").field("Class", class.clone()).build();
//!
//! let host = BindingHost::new();
//! host.set_data_context(root);
//!
//! // Runs immediately with "Spanish", then on every change until the
//! // handle is cancelled or dropped.
//! let handle = host.bind("Class.Name", |name| println!("class: {name:?}"))?;
//!
//! class.set("Name", "French")?;
//! // prints: class: Str("French")
//!
//! handle.cancel();
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod observe;
pub mod reactive;

pub use config::BindOptions;
pub use error::{BindingError, CallbackFailure, FailureReason, Result};
pub use graph::{BindingHost, HostBuilder, PropertyPath, RegistrationHandle, WeakBindingHost};
pub use observe::{FailureSink, TracingSink};
pub use reactive::{DynamicObject, FromValue, ObjectRef, PropertyAccess, PropertyListener, PropertyNotifier, Value};
