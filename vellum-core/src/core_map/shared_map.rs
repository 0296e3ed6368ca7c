/*
    shared_map.rs - The shared map facade

    Wires one MapKernel to the outside world: the value-type registry,
    the event emitter, the connection lifecycle (detach / connect /
    resubmit), snapshotting, and inbound message processing.

    Local mutations apply immediately, emit their events synchronously,
    and then submit; inbound sequenced messages go through prepare
    (async value materialization) and the kernel's reconciliation.
*/

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::errors::{MapError, MapResult};
use super::kernel::{KernelOutcome, MapKernel, OpContext};
use super::snapshot::{load_storage, serialize_storage, ChunkingParams};
use crate::core_events::Emitter;
use crate::core_protocol::connection::PendingLocalOp;
use crate::core_protocol::{
    DeltaConnection, Operation, SequencedMessage, ValueTypeOp, DETACHED_CLIENT_SEQUENCE_NUMBER,
};
use crate::core_runtime::{
    BlobStorage, ChannelAttributes, HandleContext, SnapshotResult, SnapshotTree,
};
use crate::core_values::{
    LocalValue, MapValue, ValueError, ValueOpEmitter, ValueOpSink, ValueType, ValueTypeRegistry,
};

/// Events emitted by a shared map
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// About to process a sequenced operation
    PreOp { op: Operation },
    /// Finished processing a sequenced operation
    Op { op: Operation },
    /// A key changed
    ValueChanged { key: String, previous_value: Option<MapValue> },
    /// The map was cleared
    Clear,
}

/// A replicated, eventually-consistent flat key-value container
pub struct SharedMap {
    id: String,
    kernel: MapKernel,
    registry: ValueTypeRegistry,
    events: Emitter<MapEvent>,
    connection: Option<Box<dyn DeltaConnection>>,
    handle_context: Option<Arc<dyn HandleContext>>,
    pending_ops: VecDeque<PendingLocalOp>,
    waiters: Vec<(String, oneshot::Sender<MapValue>)>,
}

impl SharedMap {
    /// Create a detached, empty map
    pub fn new(id: impl Into<String>) -> Self {
        SharedMap {
            id: id.into(),
            kernel: MapKernel::new(),
            registry: ValueTypeRegistry::new(),
            events: Emitter::new(),
            connection: None,
            handle_context: None,
            pending_ops: VecDeque::new(),
            waiters: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Channel identity for host registration
    pub fn attributes(&self) -> ChannelAttributes {
        ChannelAttributes::map()
    }

    /// Register a value type; must happen before values of that type
    /// are set or arrive
    pub fn register_value_type(&mut self, value_type: Arc<dyn ValueType>) {
        self.registry.register(value_type);
    }

    /// Access the event emitter to subscribe to map events
    pub fn events(&mut self) -> &mut Emitter<MapEvent> {
        &mut self.events
    }

    // ----- connection lifecycle -----

    pub fn is_attached(&self) -> bool {
        self.connection.is_some()
    }

    /// Install a connection and re-drive every pending operation
    /// through it, refreshing the pending markers with the newly
    /// assigned client sequence numbers
    pub fn connect(&mut self, connection: Box<dyn DeltaConnection>) {
        self.connection = Some(connection);
        self.resubmit_pending();
    }

    /// Drop the connection; later submissions queue until reconnect
    pub fn disconnect(&mut self) {
        self.connection = None;
    }

    /// Register with the host: binds every stored handle so referenced
    /// child objects get registered too
    pub fn register_with(&mut self, context: Arc<dyn HandleContext>) {
        for (_, value) in self.kernel.iter_local() {
            if let Some(handle) = value.handle() {
                context.bind(&handle.url);
            }
        }
        self.handle_context = Some(context);
    }

    // ----- read surface -----

    pub fn get(&self, key: &str) -> Option<MapValue> {
        self.kernel.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.kernel.has(key)
    }

    pub fn len(&self) -> usize {
        self.kernel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernel.is_empty()
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.kernel.keys()
    }

    /// Values in insertion order
    pub fn values(&self) -> impl Iterator<Item = MapValue> + '_ {
        self.kernel.values()
    }

    /// (key, value) pairs in insertion order
    pub fn entries(&self) -> impl Iterator<Item = (&str, MapValue)> {
        self.kernel.entries()
    }

    pub fn for_each(&self, callback: impl FnMut(&str, &MapValue)) {
        self.kernel.for_each(callback)
    }

    /// Resolve to the value under `key`: immediately when present,
    /// otherwise when the next matching `valueChanged` fires.
    ///
    /// Resolves to `None` only if the map is dropped first. No timeout
    /// is applied; callers layer their own.
    pub fn wait(&mut self, key: &str) -> impl Future<Output = Option<MapValue>> + Send + 'static {
        let (sender, receiver) = oneshot::channel();
        match self.kernel.get(key) {
            Some(value) => {
                let _ = sender.send(value);
            }
            None => {
                // Registered before returning, so no change can slip
                // between the presence check and the subscription.
                self.waiters.push((key.to_string(), sender));
            }
        }
        async move { receiver.await.ok() }
    }

    /// Resolve waiters once `key` holds a value
    fn resolve_waiters(&mut self, key: &str) {
        if !self.waiters.iter().any(|(waited, _)| waited == key) {
            return;
        }
        let Some(value) = self.kernel.get(key) else {
            return;
        };
        let mut kept = Vec::with_capacity(self.waiters.len());
        for (waited, sender) in self.waiters.drain(..) {
            if waited == key {
                let _ = sender.send(value.clone());
            } else {
                kept.push((waited, sender));
            }
        }
        self.waiters = kept;
    }

    // ----- local mutation -----

    /// Store a value under a key.
    ///
    /// Plain and handle values serialize as themselves; a value-type
    /// view is wrapped through the registered value type.
    pub fn set(&mut self, key: &str, value: impl Into<MapValue>) -> MapResult<()> {
        validate_key(key)?;
        let local_value = self.local_value_from(value.into())?;
        let serializable = local_value.make_serializable();

        if let (Some(context), Some(handle)) = (&self.handle_context, local_value.handle()) {
            context.bind(&handle.url);
        }

        let previous = self.kernel.set_local(key, local_value);
        self.events.emit(
            &MapEvent::ValueChanged {
                key: key.to_string(),
                previous_value: previous.map(|v| v.view()),
            },
            true,
            None,
        );
        self.submit_op(Operation::Set {
            key: key.to_string(),
            path: None,
            value: serializable,
        })?;
        self.resolve_waiters(key);
        Ok(())
    }

    /// Remove a key, returning whether it existed locally
    pub fn delete(&mut self, key: &str) -> MapResult<bool> {
        validate_key(key)?;
        let previous = self.kernel.delete_local(key);
        let existed = previous.is_some();
        if let Some(previous) = previous {
            self.events.emit(
                &MapEvent::ValueChanged {
                    key: key.to_string(),
                    previous_value: Some(previous.view()),
                },
                true,
                None,
            );
        }
        self.submit_op(Operation::Delete { key: key.to_string(), path: None })?;
        Ok(existed)
    }

    /// Remove every key
    pub fn clear(&mut self) -> MapResult<()> {
        self.kernel.clear_local();
        self.events.emit(&MapEvent::Clear, true, None);
        self.submit_op(Operation::Clear { path: None })?;
        Ok(())
    }

    /// Create a value of a registered value type under a key
    pub fn create_value_type(
        &mut self,
        key: &str,
        type_name: &str,
        params: serde_json::Value,
    ) -> MapResult<()> {
        validate_key(key)?;
        let local_value = self.registry.create_value_type(type_name, params)?;
        let serializable = local_value.make_serializable();

        let previous = self.kernel.set_local(key, local_value);
        self.events.emit(
            &MapEvent::ValueChanged {
                key: key.to_string(),
                previous_value: previous.map(|v| v.view()),
            },
            true,
            None,
        );
        self.submit_op(Operation::Set {
            key: key.to_string(),
            path: None,
            value: serializable,
        })?;
        self.resolve_waiters(key);
        Ok(())
    }

    /// Emitter for value-type operations on the value under `key`
    pub fn value_op_emitter(&mut self, key: &str) -> ValueOpEmitter<'_> {
        ValueOpEmitter::new(self, None, key)
    }

    // ----- snapshot -----

    /// Serialize the full state into a partitioned blob tree
    pub fn snapshot(&self) -> SnapshotTree {
        self.snapshot_with_params(&ChunkingParams::default())
    }

    pub fn snapshot_with_params(&self, params: &ChunkingParams) -> SnapshotTree {
        serialize_storage(self.kernel.iter_local(), params)
    }

    /// Restore state from a snapshot's blobs. Emits no events.
    pub async fn load(&mut self, storage: &dyn BlobStorage) -> SnapshotResult<()> {
        let entries = load_storage(storage, &self.registry).await?;
        self.kernel.populate(entries);
        Ok(())
    }

    // ----- inbound message processing -----

    /// Ingest one sequenced message.
    ///
    /// Never fails into the delta stream: unknown operations and
    /// prepare failures are logged and skipped.
    pub async fn process_message(&mut self, message: &SequencedMessage) {
        if !message.is_op() {
            return;
        }
        let Some(op) = Operation::from_wire(&message.contents) else {
            warn!(map = %self.id, "unknown operation type; ignored");
            return;
        };
        let local = self
            .connection
            .as_ref()
            .is_some_and(|c| c.client_id() == message.client_id);

        let context = match self.prepare_op(&op, local, message).await {
            Ok(context) => context,
            Err(err) => {
                warn!(map = %self.id, error = %err, "prepare failed; message skipped");
                return;
            }
        };

        if local {
            self.ack_pending(message.client_sequence_number);
        }

        self.events.emit(&MapEvent::PreOp { op: op.clone() }, local, Some(message));
        let outcome = self.process_op(&op, context, local, message);
        match outcome {
            KernelOutcome::ValueChanged { key, previous_value } => {
                self.events.emit(
                    &MapEvent::ValueChanged { key: key.clone(), previous_value },
                    local,
                    Some(message),
                );
                self.resolve_waiters(&key);
            }
            KernelOutcome::Cleared => {
                self.events.emit(&MapEvent::Clear, local, Some(message));
            }
            KernelOutcome::Ignored => {}
        }
        self.events.emit(&MapEvent::Op { op }, local, Some(message));
    }

    async fn prepare_op(
        &self,
        op: &Operation,
        local: bool,
        message: &SequencedMessage,
    ) -> MapResult<OpContext> {
        match op {
            Operation::Set { value, .. } if !local => {
                let local_value = self.registry.local_value_from_serializable(value)?;
                Ok(OpContext::Value(local_value))
            }
            Operation::Act { key, value, .. } => {
                let Some(vt) = self.kernel.get_local(key).and_then(LocalValue::as_value_type)
                else {
                    // Missing or overwritten key; the process phase
                    // drops the op.
                    return Ok(OpContext::None);
                };
                let handler = vt.handler(&value.op_name).ok_or_else(|| {
                    ValueError::UnknownValueOperation {
                        value_type: vt.type_name().to_string(),
                        op_name: value.op_name.clone(),
                    }
                })?;
                let context =
                    handler.prepare(vt.value(), &value.value, local, Some(message)).await?;
                Ok(OpContext::Act(context))
            }
            _ => Ok(OpContext::None),
        }
    }

    fn process_op(
        &mut self,
        op: &Operation,
        context: OpContext,
        local: bool,
        message: &SequencedMessage,
    ) -> KernelOutcome {
        let client_seq = message.client_sequence_number;
        match op {
            Operation::Set { key, .. } => {
                let value = match context {
                    OpContext::Value(value) => Some(value),
                    _ => None,
                };
                self.kernel.process_set(key, value, local, client_seq)
            }
            Operation::Delete { key, .. } => self.kernel.process_delete(key, local, client_seq),
            Operation::Clear { .. } => self.kernel.process_clear(local, client_seq),
            Operation::Act { key, value, .. } => {
                let act_context = match context {
                    OpContext::Act(context) => context,
                    _ => serde_json::Value::Null,
                };
                self.kernel.process_act(key, value, &act_context, local, Some(message))
            }
            Operation::CreateSubDirectory { .. } | Operation::DeleteSubDirectory { .. } => {
                debug!(map = %self.id, "directory operation on a flat map; ignored");
                KernelOutcome::Ignored
            }
        }
    }

    // ----- submission -----

    fn submit_op(&mut self, op: Operation) -> MapResult<i64> {
        let contents = serde_json::to_value(&op)?;
        let client_seq = match &mut self.connection {
            Some(connection) => connection.submit(contents),
            None => DETACHED_CLIENT_SEQUENCE_NUMBER,
        };
        match &op {
            Operation::Set { key, .. } | Operation::Delete { key, .. } => {
                self.kernel.mark_pending_key(key, client_seq);
            }
            Operation::Clear { .. } => self.kernel.mark_pending_clear(client_seq),
            _ => {}
        }
        self.pending_ops.push_back(PendingLocalOp { client_seq, op });
        Ok(client_seq)
    }

    fn resubmit_pending(&mut self) {
        let ops: Vec<Operation> = self.pending_ops.drain(..).map(|pending| pending.op).collect();
        for op in ops {
            if let Err(err) = self.submit_op(op) {
                warn!(map = %self.id, error = %err, "resubmission failed");
            }
        }
    }

    fn ack_pending(&mut self, client_seq: i64) {
        if self
            .pending_ops
            .front()
            .is_some_and(|pending| pending.client_seq == client_seq)
        {
            self.pending_ops.pop_front();
        }
    }

    fn local_value_from(&self, value: MapValue) -> MapResult<LocalValue> {
        match value {
            MapValue::Plain(value) => Ok(LocalValue::Plain(value)),
            MapValue::Handle(handle) => Ok(LocalValue::Shared(handle)),
            MapValue::ValueType { value_type, value } => {
                Ok(self.registry.create_value_type(&value_type, value)?)
            }
        }
    }

    // ----- test hooks -----

    #[cfg(test)]
    pub(crate) fn kernel(&self) -> &MapKernel {
        &self.kernel
    }

    #[cfg(test)]
    pub(crate) fn pending_op_count(&self) -> usize {
        self.pending_ops.len()
    }
}

impl ValueOpSink for SharedMap {
    fn emit_value_op(
        &mut self,
        _path: Option<&str>,
        key: &str,
        op_name: &str,
        params: serde_json::Value,
    ) -> Result<(), ValueError> {
        let previous;
        {
            let Some(vt) = self
                .kernel
                .get_local_mut(key)
                .and_then(LocalValue::as_value_type_mut)
            else {
                return Err(ValueError::NotAValueType);
            };
            let handler =
                vt.handler(op_name).ok_or_else(|| ValueError::UnknownValueOperation {
                    value_type: vt.type_name().to_string(),
                    op_name: op_name.to_string(),
                })?;
            previous = vt.view();
            handler.process(vt.value_mut(), &params, &serde_json::Value::Null, true, None)?;
        }
        self.events.emit(
            &MapEvent::ValueChanged {
                key: key.to_string(),
                previous_value: Some(previous),
            },
            true,
            None,
        );
        self.submit_op(Operation::Act {
            key: key.to_string(),
            path: None,
            value: ValueTypeOp { op_name: op_name.to_string(), value: params },
        })
        .map_err(|err| ValueError::EmitFailed(err.to_string()))?;
        self.resolve_waiters(key);
        Ok(())
    }
}

fn validate_key(key: &str) -> MapResult<()> {
    if key.is_empty() {
        return Err(MapError::InvalidKey("keys must be non-empty strings".to_string()));
    }
    Ok(())
}
