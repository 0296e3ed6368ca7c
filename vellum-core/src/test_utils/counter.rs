//! Counter value type
//!
//! The simplest useful value type: an integer with an `increment`
//! operation. Local increments apply at emit time; the kernel skips
//! the echo, so `process` applies unconditionally.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core_protocol::SequencedMessage;
use crate::core_values::{ValueError, ValueOpHandler, ValueResult, ValueType};

/// Registered name of the counter value type
pub const COUNTER_VALUE_TYPE: &str = "counter";

/// Name of the counter's only operation
pub const COUNTER_INCREMENT_OP: &str = "increment";

struct IncrementHandler;

#[async_trait]
impl ValueOpHandler for IncrementHandler {
    async fn prepare(
        &self,
        _current: &serde_json::Value,
        _params: &serde_json::Value,
        _local: bool,
        _message: Option<&SequencedMessage>,
    ) -> ValueResult<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }

    fn process(
        &self,
        current: &mut serde_json::Value,
        params: &serde_json::Value,
        _context: &serde_json::Value,
        _local: bool,
        _message: Option<&SequencedMessage>,
    ) -> ValueResult<()> {
        let delta = params
            .as_i64()
            .ok_or_else(|| ValueError::MalformedPayload("increment takes an integer".to_string()))?;
        let value = current.as_i64().unwrap_or(0);
        *current = serde_json::json!(value + delta);
        Ok(())
    }
}

/// An integer register mutated through `increment` ops
pub struct CounterValueType {
    handlers: HashMap<String, Arc<dyn ValueOpHandler>>,
}

impl CounterValueType {
    pub fn new() -> Self {
        let mut handlers: HashMap<String, Arc<dyn ValueOpHandler>> = HashMap::new();
        handlers.insert(COUNTER_INCREMENT_OP.to_string(), Arc::new(IncrementHandler));
        CounterValueType { handlers }
    }
}

impl Default for CounterValueType {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueType for CounterValueType {
    fn name(&self) -> &str {
        COUNTER_VALUE_TYPE
    }

    fn load(&self, params: serde_json::Value) -> serde_json::Value {
        // The stored form is the live integer itself.
        params
    }

    fn store(&self, live: &serde_json::Value) -> serde_json::Value {
        live.clone()
    }

    fn op_handlers(&self) -> &HashMap<String, Arc<dyn ValueOpHandler>> {
        &self.handlers
    }
}
