/*
    registry.rs - Value type registry and local value maker

    Per-container registry of pluggable value types. Materializes
    serialized values into live local values; "Plain" and "Shared" are
    built in, everything else must have been registered. A remote value
    naming an unregistered type is a prepare-failure: the caller logs
    and skips the message without touching state.
*/

use std::collections::HashMap;
use std::sync::Arc;

use super::errors::{ValueError, ValueResult};
use super::local_value::{LocalValue, ValueTypeLocalValue};
use super::serializable::{SerializableValue, PLAIN_VALUE_TYPE, SHARED_VALUE_TYPE};
use super::value_type::ValueType;
use crate::core_runtime::HandleRef;

/// Registry of the value types one container understands
#[derive(Default)]
pub struct ValueTypeRegistry {
    types: HashMap<String, Arc<dyn ValueType>>,
}

impl ValueTypeRegistry {
    pub fn new() -> Self {
        ValueTypeRegistry { types: HashMap::new() }
    }

    /// Register a value type under its own name
    pub fn register(&mut self, value_type: Arc<dyn ValueType>) {
        self.types.insert(value_type.name().to_string(), value_type);
    }

    /// Look up a registered value type
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ValueType>> {
        self.types.get(name)
    }

    /// Materialize a serialized value into its live local form
    pub fn local_value_from_serializable(
        &self,
        serializable: &SerializableValue,
    ) -> ValueResult<LocalValue> {
        match serializable.value_type.as_str() {
            PLAIN_VALUE_TYPE => Ok(LocalValue::Plain(serializable.value.clone())),
            SHARED_VALUE_TYPE => {
                let handle: HandleRef = serde_json::from_value(serializable.value.clone())
                    .map_err(|e| ValueError::MalformedPayload(e.to_string()))?;
                Ok(LocalValue::Shared(handle))
            }
            name => {
                let value_type = self
                    .types
                    .get(name)
                    .ok_or_else(|| ValueError::UnknownValueType(name.to_string()))?;
                let live = value_type.load(serializable.value.clone());
                Ok(LocalValue::ValueType(ValueTypeLocalValue::new(value_type.clone(), live)))
            }
        }
    }

    /// Build a fresh value-type local value from creation parameters
    pub fn create_value_type(
        &self,
        type_name: &str,
        params: serde_json::Value,
    ) -> ValueResult<LocalValue> {
        let value_type = self
            .types
            .get(type_name)
            .ok_or_else(|| ValueError::UnknownValueType(type_name.to_string()))?;
        let live = value_type.load(params);
        Ok(LocalValue::ValueType(ValueTypeLocalValue::new(value_type.clone(), live)))
    }
}
