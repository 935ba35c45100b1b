//! Error types for the binding engine.
//!
//! Structural errors (malformed paths, missing properties, unwritable
//! targets) are returned synchronously to whoever initiated the operation.
//! Errors raised while delivering to a subscriber never escape the delivery
//! loop; they are wrapped in a [`CallbackFailure`] and handed to the host's
//! [`FailureSink`](crate::observe::FailureSink).

use std::fmt;

/// Errors produced by the binding engine and its capabilities.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindingError {
    #[error("invalid property path `{path}`: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// The property name does not exist on the object's runtime type.
    #[error("property `{property}` not found on `{type_name}`")]
    PropertyNotFound { type_name: String, property: String },

    /// The prefix of a write path did not resolve to a present object.
    #[error("cannot write `{path}`: {reason}")]
    InvalidWriteTarget { path: String, reason: &'static str },

    #[error("type mismatch for `{property}`: expected {expected}, found {found}")]
    TypeMismatch {
        property: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("unsupported JSON value: {0}")]
    InvalidJson(String),
}

impl BindingError {
    pub(crate) fn not_found(type_name: impl Into<String>, property: impl Into<String>) -> Self {
        Self::PropertyNotFound {
            type_name: type_name.into(),
            property: property.into(),
        }
    }

    /// True for the PathResolution class of errors.
    pub fn is_path_resolution(&self) -> bool {
        matches!(self, Self::PropertyNotFound { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BindingError>;

/// Why a single subscriber delivery failed.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// Resolving the bound path for delivery failed; the subscriber was not called.
    Resolution(BindingError),
    /// The subscriber panicked.
    Panicked(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolution(err) => write!(f, "{err}"),
            Self::Panicked(msg) => write!(f, "callback panicked: {msg}"),
        }
    }
}

/// A contained delivery failure for one registration.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackFailure {
    /// The path the failing registration was bound to.
    pub path: String,
    pub reason: FailureReason,
}

impl fmt::Display for CallbackFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "binding `{}` failed: {}", self.path, self.reason)
    }
}
