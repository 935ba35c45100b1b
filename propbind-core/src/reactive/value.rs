//! Dynamically-typed property values.
//!
//! A [`Value`] is whatever a property can hold: nothing, a primitive, or a
//! shared reference to another object. Equality between values is the
//! identity test the binding tree uses to decide whether a data context
//! actually changed:
//!
//! - objects compare by reference (same allocation)
//! - primitives compare by value
//! - floats compare by bit pattern, so `NaN` equals itself

use std::fmt;
use std::rc::Rc;

use super::object::DynamicObject;
use super::property::PropertyAccess;
use crate::error::{BindingError, Result};

/// Shared handle to an externally-owned object.
pub type ObjectRef = Rc<dyn PropertyAccess>;

/// A property value.
#[derive(Clone, Default)]
pub enum Value {
    /// No value.
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Object(ObjectRef),
}

impl Value {
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn is_some(&self) -> bool {
        !self.is_none()
    }

    /// The object handle, if this value is an object.
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Object(_) => "object",
        }
    }

    /// Runtime type name as seen by property lookups.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Object(obj) => obj.type_name(),
            other => other.kind(),
        }
    }

    /// Read `name` from this value.
    ///
    /// `None` propagates as `None`; a primitive has no properties, so any
    /// name on it fails with `PropertyNotFound`.
    pub fn property(&self, name: &str) -> Result<Value> {
        match self {
            Value::None => Ok(Value::None),
            Value::Object(obj) => obj.get_property(name),
            other => Err(BindingError::not_found(other.kind(), name)),
        }
    }

    /// Build a value tree from JSON.
    ///
    /// JSON objects become [`DynamicObject`]s whose type name is `type_name`
    /// for the root and the field name for nested objects. Arrays are
    /// rejected.
    pub fn from_json(type_name: &str, json: serde_json::Value) -> Result<Value> {
        use serde_json::Value as Json;

        Ok(match json {
            Json::Null => Value::None,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(
                    n.as_f64()
                        .ok_or_else(|| BindingError::InvalidJson(n.to_string()))?,
                ),
            },
            Json::String(s) => Value::from(s),
            Json::Array(_) => {
                return Err(BindingError::InvalidJson(format!(
                    "array at `{type_name}`"
                )))
            }
            Json::Object(map) => {
                let mut builder = DynamicObject::builder(type_name);
                for (key, field) in map {
                    let value = Value::from_json(&key, field)?;
                    builder = builder.field(key, value);
                }
                Value::Object(builder.build())
            }
        })
    }

    /// Parse JSON text and build a value tree from it.
    pub fn parse_json(type_name: &str, text: &str) -> Result<Value> {
        let json: serde_json::Value =
            serde_json::from_str(text).map_err(|e| BindingError::InvalidJson(e.to_string()))?;
        Value::from_json(type_name, json)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                Rc::as_ptr(a).cast::<()>() == Rc::as_ptr(b).cast::<()>()
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Object(obj) => {
                write!(f, "Object({}@{:p})", obj.type_name(), Rc::as_ptr(obj).cast::<()>())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

impl From<Rc<DynamicObject>> for Value {
    fn from(obj: Rc<DynamicObject>) -> Self {
        Value::Object(obj)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::None, Into::into)
    }
}

/// Typed extraction from a [`Value`].
///
/// [`Value::None`] converts to the type's default so that subscribers of a
/// path with a missing intermediate object still receive something; use
/// `Option<T>` to tell "absent" apart from a default.
pub trait FromValue: Sized {
    const EXPECTED: &'static str;

    fn from_value(value: Value) -> Option<Self>;

    /// Convert, reporting a `TypeMismatch` against `property` on failure.
    fn extract(value: Value, property: &str) -> Result<Self> {
        let found = value.kind();
        Self::from_value(value).ok_or_else(|| BindingError::TypeMismatch {
            property: property.to_string(),
            expected: Self::EXPECTED,
            found,
        })
    }
}

impl FromValue for Value {
    const EXPECTED: &'static str = "any";

    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }
}

impl FromValue for bool {
    const EXPECTED: &'static str = "bool";

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::None => Some(false),
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "int";

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::None => Some(0),
            Value::Int(i) => Some(i),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "float";

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::None => Some(0.0),
            Value::Float(x) => Some(x),
            Value::Int(i) => Some(i as f64),
            _ => None,
        }
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "string";

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::None => Some(String::new()),
            Value::Str(s) => Some(s.to_string()),
            _ => None,
        }
    }
}

impl FromValue for ObjectRef {
    const EXPECTED: &'static str = "object";

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::None => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}
