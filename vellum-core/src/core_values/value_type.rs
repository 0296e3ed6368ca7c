/*
    value_type.rs - Pluggable value kinds

    A value type names a kind of live value whose mutations are
    themselves operations: every local mutation is submitted as an
    `act` op and replayed on remote replicas through the same log.

    Operation handlers are two-phase: `prepare` may suspend (resolving
    a handle, for instance) and produces a context; `process` applies
    the mutation synchronously. Reconciliation relies on `process`
    never suspending.
*/

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::errors::ValueResult;
use crate::core_protocol::SequencedMessage;

/// Two-phase handler for one named operation of a value type
#[async_trait]
pub trait ValueOpHandler: Send + Sync {
    /// Resolve any context the operation needs before it can be
    /// applied. Runs for both local and remote applications.
    async fn prepare(
        &self,
        current: &serde_json::Value,
        params: &serde_json::Value,
        local: bool,
        message: Option<&SequencedMessage>,
    ) -> ValueResult<serde_json::Value>;

    /// Apply the operation to the live value in place. Must not
    /// suspend.
    fn process(
        &self,
        current: &mut serde_json::Value,
        params: &serde_json::Value,
        context: &serde_json::Value,
        local: bool,
        message: Option<&SequencedMessage>,
    ) -> ValueResult<()>;
}

/// A registered, named kind of value
pub trait ValueType: Send + Sync {
    /// Name used as the serialized `type` tag
    fn name(&self) -> &str;

    /// Materialize the live value from its stored parameters
    fn load(&self, params: serde_json::Value) -> serde_json::Value;

    /// Project the live value back into its stored form
    fn store(&self, live: &serde_json::Value) -> serde_json::Value;

    /// The operations this value type defines, by name
    fn op_handlers(&self) -> &HashMap<String, Arc<dyn ValueOpHandler>>;
}

/// Submission side for local value-type mutations. Implemented by the
/// owning container; applying the mutation, firing `valueChanged`, and
/// submitting the `act` op all happen inside one synchronous call.
pub trait ValueOpSink {
    fn emit_value_op(
        &mut self,
        path: Option<&str>,
        key: &str,
        op_name: &str,
        params: serde_json::Value,
    ) -> ValueResult<()>;
}

/// Emits value-type operations on behalf of one stored value.
///
/// Wraps the owning container together with the `{ key, path }` the
/// value lives under, so value-type code only names the operation.
pub struct ValueOpEmitter<'a> {
    sink: &'a mut dyn ValueOpSink,
    path: Option<String>,
    key: String,
}

impl<'a> ValueOpEmitter<'a> {
    pub fn new(sink: &'a mut dyn ValueOpSink, path: Option<String>, key: impl Into<String>) -> Self {
        ValueOpEmitter { sink, path, key: key.into() }
    }

    /// Apply a named operation locally and submit its `act` op
    pub fn emit(&mut self, op_name: &str, params: serde_json::Value) -> ValueResult<()> {
        self.sink.emit_value_op(self.path.as_deref(), &self.key, op_name, params)
    }
}
