/*
    local_value.rs - Live in-memory counterpart of a serialized value

    `make_serializable` is the round-trip inverse of materialization
    through the registry. Value-type locals carry their type's handler
    table alongside the live value so `act` ops can be routed without
    another registry lookup.
*/

use std::fmt;
use std::sync::Arc;

use super::serializable::SerializableValue;
use super::value_type::{ValueOpHandler, ValueType};
use crate::core_runtime::HandleRef;

/// The consumer-facing projection of a stored value
#[derive(Debug, Clone, PartialEq)]
pub enum MapValue {
    /// A raw JSON value
    Plain(serde_json::Value),
    /// A reference to another shared object, resolved by the host
    Handle(HandleRef),
    /// The live view of a registered value type
    ValueType { value_type: String, value: serde_json::Value },
}

impl From<serde_json::Value> for MapValue {
    fn from(value: serde_json::Value) -> Self {
        MapValue::Plain(value)
    }
}

impl From<HandleRef> for MapValue {
    fn from(handle: HandleRef) -> Self {
        MapValue::Handle(handle)
    }
}

/// A live value produced by a registered value type
#[derive(Clone)]
pub struct ValueTypeLocalValue {
    value: serde_json::Value,
    value_type: Arc<dyn ValueType>,
}

impl ValueTypeLocalValue {
    pub fn new(value_type: Arc<dyn ValueType>, value: serde_json::Value) -> Self {
        ValueTypeLocalValue { value, value_type }
    }

    pub fn type_name(&self) -> &str {
        self.value_type.name()
    }

    pub fn value(&self) -> &serde_json::Value {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut serde_json::Value {
        &mut self.value
    }

    /// Handler for a named operation, if the type defines one
    pub fn handler(&self, op_name: &str) -> Option<Arc<dyn ValueOpHandler>> {
        self.value_type.op_handlers().get(op_name).cloned()
    }

    /// The stored projection of the live value
    pub fn store(&self) -> serde_json::Value {
        self.value_type.store(&self.value)
    }

    pub fn view(&self) -> MapValue {
        MapValue::ValueType {
            value_type: self.value_type.name().to_string(),
            value: self.value.clone(),
        }
    }
}

impl fmt::Debug for ValueTypeLocalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueTypeLocalValue")
            .field("type", &self.type_name())
            .field("value", &self.value)
            .finish()
    }
}

/// The in-memory counterpart of a serializable value
#[derive(Debug, Clone)]
pub enum LocalValue {
    Plain(serde_json::Value),
    Shared(HandleRef),
    ValueType(ValueTypeLocalValue),
}

impl LocalValue {
    /// The serialized `type` tag this value carries
    pub fn type_name(&self) -> &str {
        match self {
            LocalValue::Plain(_) => super::serializable::PLAIN_VALUE_TYPE,
            LocalValue::Shared(_) => super::serializable::SHARED_VALUE_TYPE,
            LocalValue::ValueType(vt) => vt.type_name(),
        }
    }

    /// Project into the wire/snapshot form; the inverse of
    /// materialization through the registry
    pub fn make_serializable(&self) -> SerializableValue {
        match self {
            LocalValue::Plain(value) => SerializableValue::plain(value.clone()),
            LocalValue::Shared(handle) => SerializableValue::shared(handle),
            LocalValue::ValueType(vt) => SerializableValue {
                value_type: vt.type_name().to_string(),
                value: vt.store(),
            },
        }
    }

    /// Project into the consumer-facing view
    pub fn view(&self) -> MapValue {
        match self {
            LocalValue::Plain(value) => MapValue::Plain(value.clone()),
            LocalValue::Shared(handle) => MapValue::Handle(handle.clone()),
            LocalValue::ValueType(vt) => vt.view(),
        }
    }

    /// The handle this value references, if it is a shared reference
    pub fn handle(&self) -> Option<&HandleRef> {
        match self {
            LocalValue::Shared(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn as_value_type(&self) -> Option<&ValueTypeLocalValue> {
        match self {
            LocalValue::ValueType(vt) => Some(vt),
            _ => None,
        }
    }

    pub fn as_value_type_mut(&mut self) -> Option<&mut ValueTypeLocalValue> {
        match self {
            LocalValue::ValueType(vt) => Some(vt),
            _ => None,
        }
    }
}
