//! Object model facade
//!
//! The modelling tool exposes a dynamic object system: objects belong to a
//! named class and carry named attributes. [`ObjectModel`] is the narrow
//! slice of that system a prediction run consumes. [`RoomModel`] layers one
//! typed method per logical field on top so the worker never handles class or
//! attribute names directly.

mod memory;
mod room;
pub mod schema;

pub use memory::{InMemoryModel, ModelSnapshot, ObjectSnapshot};
pub use room::RoomModel;

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an object instance in the model
pub type ObjectId = String;

/// Attribute value as stored by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(String),
}

impl AttrValue {
    /// Read as a real; integers widen
    pub fn as_real(&self) -> Option<f64> {
        match self {
            AttrValue::Real(v) => Some(*v),
            AttrValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttrValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            AttrValue::Boolean(_) => "Boolean",
            AttrValue::Integer(_) => "Integer",
            AttrValue::Real(_) => "Real",
            AttrValue::String(_) => "String",
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Boolean(v) => write!(f, "{}", v),
            AttrValue::Integer(v) => write!(f, "{}", v),
            AttrValue::Real(v) => write!(f, "{}", v),
            AttrValue::String(v) => write!(f, "'{}'", v),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Boolean(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Integer(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Real(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::String(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::String(v)
    }
}

/// Dynamic access to the live object model
pub trait ObjectModel: Send + Sync {
    /// All objects of a class, in a stable order
    fn objects_of_class(&self, class: &str) -> Vec<ObjectId>;

    /// Any one object of a class, used for singleton lookups
    fn any_object_of_class(&self, class: &str) -> Option<ObjectId> {
        self.objects_of_class(class).into_iter().next()
    }

    /// Raw attribute value, `None` when the object or attribute is unset
    fn attribute(&self, object: &str, attribute: &str) -> Option<AttrValue>;

    /// Real-valued attribute, `None` when unset or not numeric
    fn real_attribute(&self, object: &str, attribute: &str) -> Option<f64> {
        self.attribute(object, attribute).and_then(|v| v.as_real())
    }

    /// Integer-valued attribute, `None` when unset or not an integer
    fn integer_attribute(&self, object: &str, attribute: &str) -> Option<i64> {
        self.attribute(object, attribute).and_then(|v| v.as_integer())
    }

    /// Whether `set_attribute` would accept this value, without writing it
    fn check_attribute(
        &self,
        object: &str,
        attribute: &str,
        value: &AttrValue,
    ) -> Result<(), ModelError>;

    fn set_attribute(
        &self,
        object: &str,
        attribute: &str,
        value: AttrValue,
    ) -> Result<(), ModelError>;

    /// Recompute derived attributes
    fn update_derived_values(&self);
}
