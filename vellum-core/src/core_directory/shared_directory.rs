/*
    shared_directory.rs - The hierarchical shared container

    Owns the node arena (absolute path -> DirNode) and routes every
    operation by type and path. Each node mirrors the flat map's
    reconciliation, scoped to its own key storage, plus the symmetric
    pending rules for subdirectory creation and deletion.

    Operations addressed to a node that no longer exists are dropped:
    the subtree may have been deleted concurrently.
*/

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::cursor::{SubDirectoryCursor, SubDirectoryView};
use super::errors::{DirectoryError, DirectoryResult};
use super::node::DirNode;
use super::path::{
    self, posix_join, posix_resolve, validate_sub_directory_name, ROOT_PATH,
};
use super::snapshot::{data_from_storage, tree_from_data, DirectoryDataObject};
use crate::core_events::Emitter;
use crate::core_map::kernel::{KernelOutcome, OpContext};
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

/// Events emitted by a shared directory
#[derive(Debug, Clone, PartialEq)]
pub enum DirectoryEvent {
    /// About to process a sequenced operation
    PreOp { op: Operation },
    /// Finished processing a sequenced operation
    Op { op: Operation },
    /// A key changed at some node
    ValueChanged { path: String, key: String, previous_value: Option<MapValue> },
    /// A node's key storage was cleared
    Clear { path: String },
}

/// What applying one sequenced operation did to the tree
enum DirectoryOutcome {
    Ignored,
    ValueChanged { path: String, key: String, previous_value: Option<MapValue> },
    Cleared { path: String },
}

/// A replicated, eventually-consistent hierarchical key-value container
pub struct SharedDirectory {
    id: String,
    nodes: HashMap<String, DirNode>,
    registry: ValueTypeRegistry,
    events: Emitter<DirectoryEvent>,
    connection: Option<Box<dyn DeltaConnection>>,
    handle_context: Option<Arc<dyn HandleContext>>,
    pending_ops: VecDeque<PendingLocalOp>,
    waiters: Vec<(String, String, oneshot::Sender<MapValue>)>,
}

impl SharedDirectory {
    /// Create a detached directory with an empty root
    pub fn new(id: impl Into<String>) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(ROOT_PATH.to_string(), DirNode::new());
        SharedDirectory {
            id: id.into(),
            nodes,
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
        ChannelAttributes::directory()
    }

    /// Register a value type; must happen before values of that type
    /// are set or arrive
    pub fn register_value_type(&mut self, value_type: Arc<dyn ValueType>) {
        self.registry.register(value_type);
    }

    /// Access the event emitter to subscribe to directory events
    pub fn events(&mut self) -> &mut Emitter<DirectoryEvent> {
        &mut self.events
    }

    // ----- connection lifecycle -----

    pub fn is_attached(&self) -> bool {
        self.connection.is_some()
    }

    /// Install a connection and re-drive every pending operation
    pub fn connect(&mut self, connection: Box<dyn DeltaConnection>) {
        self.connection = Some(connection);
        self.resubmit_pending();
    }

    /// Drop the connection; later submissions queue until reconnect
    pub fn disconnect(&mut self) {
        self.connection = None;
    }

    /// Register with the host: binds every stored handle in the tree
    pub fn register_with(&mut self, context: Arc<dyn HandleContext>) {
        for node in self.nodes.values() {
            for (_, value) in node.kernel.iter_local() {
                if let Some(handle) = value.handle() {
                    context.bind(&handle.url);
                }
            }
        }
        self.handle_context = Some(context);
    }

    // ----- root-scoped map surface -----

    pub fn get(&self, key: &str) -> Option<MapValue> {
        self.get_at(ROOT_PATH, key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.get_at(ROOT_PATH, key).is_some()
    }

    pub fn len(&self) -> usize {
        self.node(ROOT_PATH).map_or(0, |node| node.kernel.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Root keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.node(ROOT_PATH).into_iter().flat_map(|node| node.kernel.keys())
    }

    /// Root (key, value) pairs in insertion order
    pub fn entries(&self) -> impl Iterator<Item = (&str, MapValue)> {
        self.node(ROOT_PATH).into_iter().flat_map(|node| node.kernel.entries())
    }

    pub fn set(&mut self, key: &str, value: impl Into<MapValue>) -> DirectoryResult<()> {
        self.set_at(ROOT_PATH, key, value.into())
    }

    pub fn delete(&mut self, key: &str) -> DirectoryResult<bool> {
        self.delete_at(ROOT_PATH, key)
    }

    pub fn clear(&mut self) -> DirectoryResult<()> {
        self.clear_at(ROOT_PATH)
    }

    pub fn create_value_type(
        &mut self,
        key: &str,
        type_name: &str,
        params: serde_json::Value,
    ) -> DirectoryResult<()> {
        self.create_value_type_at(ROOT_PATH, key, type_name, params)
    }

    /// Emitter for value-type operations on a root value
    pub fn value_op_emitter(&mut self, key: &str) -> ValueOpEmitter<'_> {
        ValueOpEmitter::new(self, Some(ROOT_PATH.to_string()), key)
    }

    // ----- tree navigation -----

    /// Create (or return) a direct child of the root
    pub fn create_sub_directory(&mut self, name: &str) -> DirectoryResult<SubDirectoryCursor<'_>> {
        let child_path = self.create_sub_directory_at(ROOT_PATH, name)?;
        Ok(SubDirectoryCursor::new(self, child_path))
    }

    /// Delete a direct child of the root and its whole subtree.
    ///
    /// No events fire for the dropped descendants.
    pub fn delete_sub_directory(&mut self, name: &str) -> DirectoryResult<bool> {
        self.delete_sub_directory_at(ROOT_PATH, name)
    }

    pub fn get_sub_directory(&self, name: &str) -> Option<SubDirectoryView<'_>> {
        self.working_directory(&posix_join(ROOT_PATH, name))
    }

    pub fn has_sub_directory(&self, name: &str) -> bool {
        self.node(ROOT_PATH).is_some_and(|node| node.children.contains(name))
    }

    /// Names of the root's children, in creation order
    pub fn sub_directories(&self) -> impl Iterator<Item = &str> {
        self.node(ROOT_PATH)
            .into_iter()
            .flat_map(|node| node.children.iter().map(String::as_str))
    }

    /// Resolve a relative or absolute path to a read-only view of a
    /// node; `None` if any component is missing
    pub fn working_directory(&self, target: &str) -> Option<SubDirectoryView<'_>> {
        let absolute = posix_resolve(ROOT_PATH, target);
        self.nodes.contains_key(&absolute).then(|| SubDirectoryView::new(self, absolute))
    }

    /// Resolve a relative or absolute path to a mutating cursor
    pub fn working_directory_mut(&mut self, target: &str) -> Option<SubDirectoryCursor<'_>> {
        let absolute = posix_resolve(ROOT_PATH, target);
        if !self.nodes.contains_key(&absolute) {
            return None;
        }
        Some(SubDirectoryCursor::new(self, absolute))
    }

    /// Resolve to the value under `(path, key)`: immediately when
    /// present, otherwise when the next matching `valueChanged` fires.
    ///
    /// Resolves to `None` only if the directory is dropped first.
    pub fn wait(
        &mut self,
        target: &str,
        key: &str,
    ) -> impl Future<Output = Option<MapValue>> + Send + 'static {
        let absolute = posix_resolve(ROOT_PATH, target);
        let (sender, receiver) = oneshot::channel();
        match self.get_at(&absolute, key) {
            Some(value) => {
                let _ = sender.send(value);
            }
            None => {
                self.waiters.push((absolute, key.to_string(), sender));
            }
        }
        async move { receiver.await.ok() }
    }

    // ----- snapshot -----

    /// Serialize the whole tree into a single-header snapshot
    pub fn snapshot(&self) -> SnapshotResult<SnapshotTree> {
        tree_from_data(&self.data_object_at(ROOT_PATH))
    }

    /// Restore the tree from a snapshot's blobs. Emits no events.
    pub async fn load(&mut self, storage: &dyn BlobStorage) -> SnapshotResult<()> {
        let data = data_from_storage(storage).await?;
        self.populate_node(ROOT_PATH, &data)?;
        Ok(())
    }

    // ----- inbound message processing -----

    /// Ingest one sequenced message.
    ///
    /// Never fails into the delta stream: unknown operations, prepare
    /// failures, and operations for vanished subdirectories are logged
    /// and skipped.
    pub async fn process_message(&mut self, message: &SequencedMessage) {
        if !message.is_op() {
            return;
        }
        let Some(op) = Operation::from_wire(&message.contents) else {
            warn!(directory = %self.id, "unknown operation type; ignored");
            return;
        };
        let local = self
            .connection
            .as_ref()
            .is_some_and(|c| c.client_id() == message.client_id);

        let context = match self.prepare_core(&op, local, message).await {
            Ok(context) => context,
            Err(err) => {
                warn!(directory = %self.id, error = %err, "prepare failed; message skipped");
                return;
            }
        };

        if local {
            self.ack_pending(message.client_sequence_number);
        }

        self.events.emit(&DirectoryEvent::PreOp { op: op.clone() }, local, Some(message));
        let outcome = self.process_core(&op, context, local, message);
        match outcome {
            DirectoryOutcome::ValueChanged { path, key, previous_value } => {
                self.events.emit(
                    &DirectoryEvent::ValueChanged {
                        path: path.clone(),
                        key: key.clone(),
                        previous_value,
                    },
                    local,
                    Some(message),
                );
                self.resolve_waiters(&path, &key);
            }
            DirectoryOutcome::Cleared { path } => {
                self.events.emit(&DirectoryEvent::Clear { path }, local, Some(message));
            }
            DirectoryOutcome::Ignored => {}
        }
        self.events.emit(&DirectoryEvent::Op { op }, local, Some(message));
    }

    /// Materialize whatever the operation carries before any state is
    /// touched. The only suspension point of inbound processing.
    async fn prepare_core(
        &self,
        op: &Operation,
        local: bool,
        message: &SequencedMessage,
    ) -> DirectoryResult<OpContext> {
        match op {
            Operation::Set { value, .. } if !local => {
                Ok(OpContext::Value(self.registry.local_value_from_serializable(value)?))
            }
            Operation::Act { key, path, value } => {
                let node_path = op_path(path);
                let Some(vt) = self
                    .nodes
                    .get(node_path)
                    .and_then(|node| node.kernel.get_local(key))
                    .and_then(LocalValue::as_value_type)
                else {
                    // Missing node or non-value-type key; dropped in
                    // the process phase.
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

    /// Route the operation to its target node. Synchronous.
    fn process_core(
        &mut self,
        op: &Operation,
        context: OpContext,
        local: bool,
        message: &SequencedMessage,
    ) -> DirectoryOutcome {
        let client_seq = message.client_sequence_number;
        match op {
            Operation::Set { key, path, .. } => {
                let node_path = op_path(path).to_string();
                let Some(node) = self.nodes.get_mut(&node_path) else {
                    debug!(directory = %self.id, path = %node_path, "op for deleted subdirectory; dropped");
                    return DirectoryOutcome::Ignored;
                };
                let value = match context {
                    OpContext::Value(value) => Some(value),
                    _ => None,
                };
                wrap(node.kernel.process_set(key, value, local, client_seq), node_path)
            }
            Operation::Delete { key, path } => {
                let node_path = op_path(path).to_string();
                let Some(node) = self.nodes.get_mut(&node_path) else {
                    debug!(directory = %self.id, path = %node_path, "op for deleted subdirectory; dropped");
                    return DirectoryOutcome::Ignored;
                };
                wrap(node.kernel.process_delete(key, local, client_seq), node_path)
            }
            Operation::Clear { path } => {
                let node_path = op_path(path).to_string();
                let Some(node) = self.nodes.get_mut(&node_path) else {
                    debug!(directory = %self.id, path = %node_path, "op for deleted subdirectory; dropped");
                    return DirectoryOutcome::Ignored;
                };
                wrap(node.kernel.process_clear(local, client_seq), node_path)
            }
            Operation::Act { key, path, value } => {
                let node_path = op_path(path).to_string();
                let Some(node) = self.nodes.get_mut(&node_path) else {
                    debug!(directory = %self.id, path = %node_path, "op for deleted subdirectory; dropped");
                    return DirectoryOutcome::Ignored;
                };
                let act_context = match context {
                    OpContext::Act(context) => context,
                    _ => serde_json::Value::Null,
                };
                wrap(
                    node.kernel.process_act(key, value, &act_context, local, Some(message)),
                    node_path,
                )
            }
            Operation::CreateSubDirectory { path, subdir_name } => {
                self.process_create_sub_directory(path, subdir_name, local, client_seq)
            }
            Operation::DeleteSubDirectory { path, subdir_name } => {
                self.process_delete_sub_directory(path, subdir_name, local, client_seq)
            }
        }
    }

    fn process_create_sub_directory(
        &mut self,
        parent_path: &str,
        name: &str,
        local: bool,
        client_seq: i64,
    ) -> DirectoryOutcome {
        let Some(node) = self.nodes.get_mut(parent_path) else {
            debug!(directory = %self.id, path = %parent_path, "create for deleted subdirectory; dropped");
            return DirectoryOutcome::Ignored;
        };
        if local {
            node.ack_pending_sub_dir(name, client_seq);
            return DirectoryOutcome::Ignored;
        }
        if node.has_pending_sub_dir(name) {
            return DirectoryOutcome::Ignored;
        }
        node.children.insert(name.to_string());
        let child_path = posix_join(parent_path, name);
        self.nodes.entry(child_path).or_default();
        DirectoryOutcome::Ignored
    }

    fn process_delete_sub_directory(
        &mut self,
        parent_path: &str,
        name: &str,
        local: bool,
        client_seq: i64,
    ) -> DirectoryOutcome {
        let Some(node) = self.nodes.get_mut(parent_path) else {
            debug!(directory = %self.id, path = %parent_path, "delete for deleted subdirectory; dropped");
            return DirectoryOutcome::Ignored;
        };
        if local {
            node.ack_pending_sub_dir(name, client_seq);
            return DirectoryOutcome::Ignored;
        }
        if node.has_pending_sub_dir(name) {
            return DirectoryOutcome::Ignored;
        }
        if node.children.contains(name) {
            let child_path = posix_join(parent_path, name);
            self.remove_subtree(&child_path);
        }
        DirectoryOutcome::Ignored
    }

    // ----- node-scoped internals (shared with cursors) -----

    pub(crate) fn node(&self, path: &str) -> Option<&DirNode> {
        self.nodes.get(path)
    }

    pub(crate) fn get_at(&self, path: &str, key: &str) -> Option<MapValue> {
        self.nodes.get(path).and_then(|node| node.kernel.get(key))
    }

    pub(crate) fn set_at(
        &mut self,
        path: &str,
        key: &str,
        value: MapValue,
    ) -> DirectoryResult<()> {
        validate_key(key)?;
        let local_value = self.local_value_from(value)?;
        let serializable = local_value.make_serializable();

        if let (Some(context), Some(handle)) = (&self.handle_context, local_value.handle()) {
            context.bind(&handle.url);
        }

        let node = self
            .nodes
            .get_mut(path)
            .ok_or_else(|| DirectoryError::SubDirectoryNotFound(path.to_string()))?;
        let previous = node.kernel.set_local(key, local_value);
        self.events.emit(
            &DirectoryEvent::ValueChanged {
                path: path.to_string(),
                key: key.to_string(),
                previous_value: previous.map(|v| v.view()),
            },
            true,
            None,
        );
        self.submit_op(Operation::Set {
            key: key.to_string(),
            path: Some(path.to_string()),
            value: serializable,
        })?;
        self.resolve_waiters(path, key);
        Ok(())
    }

    pub(crate) fn delete_at(&mut self, path: &str, key: &str) -> DirectoryResult<bool> {
        validate_key(key)?;
        let node = self
            .nodes
            .get_mut(path)
            .ok_or_else(|| DirectoryError::SubDirectoryNotFound(path.to_string()))?;
        let previous = node.kernel.delete_local(key);
        let existed = previous.is_some();
        if let Some(previous) = previous {
            self.events.emit(
                &DirectoryEvent::ValueChanged {
                    path: path.to_string(),
                    key: key.to_string(),
                    previous_value: Some(previous.view()),
                },
                true,
                None,
            );
        }
        self.submit_op(Operation::Delete {
            key: key.to_string(),
            path: Some(path.to_string()),
        })?;
        Ok(existed)
    }

    pub(crate) fn clear_at(&mut self, path: &str) -> DirectoryResult<()> {
        let node = self
            .nodes
            .get_mut(path)
            .ok_or_else(|| DirectoryError::SubDirectoryNotFound(path.to_string()))?;
        node.kernel.clear_local();
        self.events.emit(&DirectoryEvent::Clear { path: path.to_string() }, true, None);
        self.submit_op(Operation::Clear { path: Some(path.to_string()) })?;
        Ok(())
    }

    pub(crate) fn create_value_type_at(
        &mut self,
        path: &str,
        key: &str,
        type_name: &str,
        params: serde_json::Value,
    ) -> DirectoryResult<()> {
        validate_key(key)?;
        let local_value = self.registry.create_value_type(type_name, params)?;
        let serializable = local_value.make_serializable();

        let node = self
            .nodes
            .get_mut(path)
            .ok_or_else(|| DirectoryError::SubDirectoryNotFound(path.to_string()))?;
        let previous = node.kernel.set_local(key, local_value);
        self.events.emit(
            &DirectoryEvent::ValueChanged {
                path: path.to_string(),
                key: key.to_string(),
                previous_value: previous.map(|v| v.view()),
            },
            true,
            None,
        );
        self.submit_op(Operation::Set {
            key: key.to_string(),
            path: Some(path.to_string()),
            value: serializable,
        })?;
        self.resolve_waiters(path, key);
        Ok(())
    }

    /// Create a child locally (idempotent) and submit the op
    pub(crate) fn create_sub_directory_at(
        &mut self,
        parent_path: &str,
        name: &str,
    ) -> DirectoryResult<String> {
        validate_sub_directory_name(name)?;
        let node = self
            .nodes
            .get_mut(parent_path)
            .ok_or_else(|| DirectoryError::SubDirectoryNotFound(parent_path.to_string()))?;
        node.children.insert(name.to_string());
        let child_path = posix_join(parent_path, name);
        self.nodes.entry(child_path.clone()).or_default();
        self.submit_op(Operation::CreateSubDirectory {
            path: parent_path.to_string(),
            subdir_name: name.to_string(),
        })?;
        Ok(child_path)
    }

    /// Drop a child subtree locally and submit the op.
    ///
    /// Descendant handles become garbage; no events fire for the
    /// dropped keys.
    pub(crate) fn delete_sub_directory_at(
        &mut self,
        parent_path: &str,
        name: &str,
    ) -> DirectoryResult<bool> {
        let node = self
            .nodes
            .get_mut(parent_path)
            .ok_or_else(|| DirectoryError::SubDirectoryNotFound(parent_path.to_string()))?;
        let existed = node.children.contains(name);
        if existed {
            let child_path = posix_join(parent_path, name);
            self.remove_subtree(&child_path);
        }
        self.submit_op(Operation::DeleteSubDirectory {
            path: parent_path.to_string(),
            subdir_name: name.to_string(),
        })?;
        Ok(existed)
    }

    fn remove_subtree(&mut self, subtree_path: &str) {
        if let (Some(parent_path), Some(name)) =
            (path::parent(subtree_path), path::leaf_name(subtree_path))
        {
            if let Some(parent_node) = self.nodes.get_mut(parent_path) {
                parent_node.children.remove(name);
            }
        }
        let mut stack = vec![subtree_path.to_string()];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                for child in node.children {
                    stack.push(posix_join(&current, &child));
                }
            }
        }
    }

    // ----- submission -----

    fn submit_op(&mut self, op: Operation) -> DirectoryResult<i64> {
        let contents = serde_json::to_value(&op)?;
        let client_seq = match &mut self.connection {
            Some(connection) => connection.submit(contents),
            None => DETACHED_CLIENT_SEQUENCE_NUMBER,
        };
        match &op {
            Operation::Set { key, path, .. } | Operation::Delete { key, path } => {
                if let Some(node) = self.nodes.get_mut(op_path(path)) {
                    node.kernel.mark_pending_key(key, client_seq);
                }
            }
            Operation::Clear { path } => {
                if let Some(node) = self.nodes.get_mut(op_path(path)) {
                    node.kernel.mark_pending_clear(client_seq);
                }
            }
            Operation::CreateSubDirectory { path, subdir_name }
            | Operation::DeleteSubDirectory { path, subdir_name } => {
                if let Some(node) = self.nodes.get_mut(path.as_str()) {
                    node.mark_pending_sub_dir(subdir_name, client_seq);
                }
            }
            Operation::Act { .. } => {}
        }
        self.pending_ops.push_back(PendingLocalOp { client_seq, op });
        Ok(client_seq)
    }

    fn resubmit_pending(&mut self) {
        let ops: Vec<Operation> = self.pending_ops.drain(..).map(|pending| pending.op).collect();
        for op in ops {
            if let Err(err) = self.submit_op(op) {
                warn!(directory = %self.id, error = %err, "resubmission failed");
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

    fn local_value_from(&self, value: MapValue) -> DirectoryResult<LocalValue> {
        match value {
            MapValue::Plain(value) => Ok(LocalValue::Plain(value)),
            MapValue::Handle(handle) => Ok(LocalValue::Shared(handle)),
            MapValue::ValueType { value_type, value } => {
                Ok(self.registry.create_value_type(&value_type, value)?)
            }
        }
    }

    fn resolve_waiters(&mut self, node_path: &str, key: &str) {
        if !self
            .waiters
            .iter()
            .any(|(path, waited, _)| path == node_path && waited == key)
        {
            return;
        }
        let Some(value) = self.get_at(node_path, key) else {
            return;
        };
        let mut kept = Vec::with_capacity(self.waiters.len());
        for (path, waited, sender) in self.waiters.drain(..) {
            if path == node_path && waited == key {
                let _ = sender.send(value.clone());
            } else {
                kept.push((path, waited, sender));
            }
        }
        self.waiters = kept;
    }

    // ----- snapshot internals -----

    fn data_object_at(&self, node_path: &str) -> DirectoryDataObject {
        let Some(node) = self.nodes.get(node_path) else {
            return DirectoryDataObject::default();
        };
        let storage: BTreeMap<String, _> = node
            .kernel
            .iter_local()
            .map(|(key, value)| (key.clone(), value.make_serializable()))
            .collect();
        let subdirectories: BTreeMap<String, _> = node
            .children
            .iter()
            .map(|name| (name.clone(), self.data_object_at(&posix_join(node_path, name))))
            .collect();
        DirectoryDataObject {
            storage: (!storage.is_empty()).then_some(storage),
            subdirectories: (!subdirectories.is_empty()).then_some(subdirectories),
        }
    }

    fn populate_node(
        &mut self,
        node_path: &str,
        data: &DirectoryDataObject,
    ) -> SnapshotResult<()> {
        self.nodes.entry(node_path.to_string()).or_default();
        if let Some(storage) = &data.storage {
            let mut entries = Vec::with_capacity(storage.len());
            for (key, serializable) in storage {
                entries.push((
                    key.clone(),
                    self.registry.local_value_from_serializable(serializable)?,
                ));
            }
            if let Some(node) = self.nodes.get_mut(node_path) {
                node.kernel.populate(entries);
            }
        }
        if let Some(subdirectories) = &data.subdirectories {
            for (name, child_data) in subdirectories {
                if let Some(node) = self.nodes.get_mut(node_path) {
                    node.children.insert(name.clone());
                }
                let child_path = posix_join(node_path, name);
                self.populate_node(&child_path, child_data)?;
            }
        }
        Ok(())
    }

    // ----- test hooks -----

    #[cfg(test)]
    pub(crate) fn pending_op_count(&self) -> usize {
        self.pending_ops.len()
    }
}

impl ValueOpSink for SharedDirectory {
    fn emit_value_op(
        &mut self,
        path: Option<&str>,
        key: &str,
        op_name: &str,
        params: serde_json::Value,
    ) -> Result<(), ValueError> {
        let node_path = path.unwrap_or(ROOT_PATH).to_string();
        let previous;
        {
            let Some(vt) = self
                .nodes
                .get_mut(&node_path)
                .and_then(|node| node.kernel.get_local_mut(key))
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
            &DirectoryEvent::ValueChanged {
                path: node_path.clone(),
                key: key.to_string(),
                previous_value: Some(previous),
            },
            true,
            None,
        );
        self.submit_op(Operation::Act {
            key: key.to_string(),
            path: Some(node_path.clone()),
            value: ValueTypeOp { op_name: op_name.to_string(), value: params },
        })
        .map_err(|err| ValueError::EmitFailed(err.to_string()))?;
        self.resolve_waiters(&node_path, key);
        Ok(())
    }
}

/// Wrap a kernel outcome with the node path it happened at
fn wrap(outcome: KernelOutcome, node_path: String) -> DirectoryOutcome {
    match outcome {
        KernelOutcome::Ignored => DirectoryOutcome::Ignored,
        KernelOutcome::ValueChanged { key, previous_value } => {
            DirectoryOutcome::ValueChanged { path: node_path, key, previous_value }
        }
        KernelOutcome::Cleared => DirectoryOutcome::Cleared { path: node_path },
    }
}

/// The node path an operation addresses; storage ops written by the
/// flat map omit it
fn op_path(path: &Option<String>) -> &str {
    path.as_deref().unwrap_or(ROOT_PATH)
}

fn validate_key(key: &str) -> DirectoryResult<()> {
    if key.is_empty() {
        return Err(DirectoryError::InvalidKey("keys must be non-empty strings".to_string()));
    }
    Ok(())
}
