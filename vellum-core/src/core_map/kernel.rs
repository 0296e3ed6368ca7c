/*
    kernel.rs - State and reconciliation for one flat key-space

    The kernel owns the authoritative in-memory state of a single
    key-space and the optimistic-concurrency bookkeeping:

    - pending_keys maps each key with an unacknowledged local set/delete
      to the latest client sequence number assigned for it
    - pending_clear holds the client sequence number of an
      unacknowledged local clear

    Convergence is last-writer-wins in total-order position, except
    that local unacknowledged writes shadow remote writes until their
    echo arrives. A locally-issued clear that has not round-tripped
    masks every remote storage op.

    The directory reuses this kernel per tree node.
*/

use std::collections::HashMap;

use hashlink::LinkedHashMap;
use tracing::{debug, warn};

use crate::core_protocol::{SequencedMessage, ValueTypeOp};
use crate::core_values::{LocalValue, MapValue};

/// What applying one sequenced operation did to kernel state
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum KernelOutcome {
    /// Message consumed without a state change (echo, shadowed, or
    /// dropped)
    Ignored,
    /// A key changed; `previous_value` is the projection before the op
    ValueChanged { key: String, previous_value: Option<MapValue> },
    /// The key-space was cleared
    Cleared,
}

/// Context produced by the prepare phase of message processing
#[derive(Debug)]
pub(crate) enum OpContext {
    None,
    /// Materialized local value for a remote set
    Value(LocalValue),
    /// Value-type op context from the handler's prepare
    Act(serde_json::Value),
}

/// Authoritative state for one flat key-space
pub struct MapKernel {
    storage: LinkedHashMap<String, LocalValue>,
    pending_keys: HashMap<String, i64>,
    pending_clear: Option<i64>,
}

impl MapKernel {
    pub fn new() -> Self {
        MapKernel {
            storage: LinkedHashMap::new(),
            pending_keys: HashMap::new(),
            pending_clear: None,
        }
    }

    // ----- read surface -----

    pub fn get(&self, key: &str) -> Option<MapValue> {
        self.storage.get(key).map(LocalValue::view)
    }

    pub fn has(&self, key: &str) -> bool {
        self.storage.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.storage.keys().map(String::as_str)
    }

    /// Value projections in insertion order
    pub fn values(&self) -> impl Iterator<Item = MapValue> + '_ {
        self.storage.values().map(LocalValue::view)
    }

    /// (key, value) pairs in insertion order
    pub fn entries(&self) -> impl Iterator<Item = (&str, MapValue)> {
        self.storage.iter().map(|(k, v)| (k.as_str(), v.view()))
    }

    pub fn for_each(&self, mut callback: impl FnMut(&str, &MapValue)) {
        for (key, value) in self.storage.iter() {
            callback(key, &value.view());
        }
    }

    pub(crate) fn get_local(&self, key: &str) -> Option<&LocalValue> {
        self.storage.get(key)
    }

    pub(crate) fn get_local_mut(&mut self, key: &str) -> Option<&mut LocalValue> {
        self.storage.get_mut(key)
    }

    pub(crate) fn iter_local(&self) -> impl Iterator<Item = (&String, &LocalValue)> {
        self.storage.iter()
    }

    // ----- local (optimistic) mutation -----

    pub(crate) fn set_local(&mut self, key: &str, value: LocalValue) -> Option<LocalValue> {
        self.storage.insert(key.to_string(), value)
    }

    pub(crate) fn delete_local(&mut self, key: &str) -> Option<LocalValue> {
        self.storage.remove(key)
    }

    pub(crate) fn clear_local(&mut self) {
        self.storage.clear();
    }

    /// Insert entries restored from a snapshot; no pending bookkeeping,
    /// no events
    pub(crate) fn populate(&mut self, entries: Vec<(String, LocalValue)>) {
        for (key, value) in entries {
            self.storage.insert(key, value);
        }
    }

    // ----- pending bookkeeping -----

    pub(crate) fn mark_pending_key(&mut self, key: &str, client_seq: i64) {
        self.pending_keys.insert(key.to_string(), client_seq);
    }

    pub(crate) fn mark_pending_clear(&mut self, client_seq: i64) {
        self.pending_clear = Some(client_seq);
    }

    pub(crate) fn has_pending_key(&self, key: &str) -> bool {
        self.pending_keys.contains_key(key)
    }

    pub(crate) fn pending_key_count(&self) -> usize {
        self.pending_keys.len()
    }

    pub(crate) fn pending_clear(&self) -> Option<i64> {
        self.pending_clear
    }

    // ----- reconciliation of sequenced operations -----

    /// Process a sequenced `set`. `value` is the materialized local
    /// value for remote ops; local echoes carry no value.
    pub(crate) fn process_set(
        &mut self,
        key: &str,
        value: Option<LocalValue>,
        local: bool,
        client_seq: i64,
    ) -> KernelOutcome {
        if local {
            // Our echo; the optimistic value is already in place.
            if self.pending_keys.get(key) == Some(&client_seq) {
                self.pending_keys.remove(key);
            }
            return KernelOutcome::Ignored;
        }
        if self.pending_clear.is_some() {
            return KernelOutcome::Ignored;
        }
        if self.pending_keys.contains_key(key) {
            // The remote writer had not observed our in-flight write.
            return KernelOutcome::Ignored;
        }
        let Some(value) = value else {
            warn!(key, "remote set arrived without a prepared value; dropped");
            return KernelOutcome::Ignored;
        };
        let previous = self.storage.insert(key.to_string(), value);
        KernelOutcome::ValueChanged {
            key: key.to_string(),
            previous_value: previous.map(|v| v.view()),
        }
    }

    /// Process a sequenced `delete`
    pub(crate) fn process_delete(
        &mut self,
        key: &str,
        local: bool,
        client_seq: i64,
    ) -> KernelOutcome {
        if local {
            if self.pending_keys.get(key) == Some(&client_seq) {
                self.pending_keys.remove(key);
            }
            return KernelOutcome::Ignored;
        }
        if self.pending_clear.is_some() || self.pending_keys.contains_key(key) {
            return KernelOutcome::Ignored;
        }
        match self.storage.remove(key) {
            Some(previous) => KernelOutcome::ValueChanged {
                key: key.to_string(),
                previous_value: Some(previous.view()),
            },
            None => KernelOutcome::Ignored,
        }
    }

    /// Process a sequenced `clear`
    pub(crate) fn process_clear(&mut self, local: bool, client_seq: i64) -> KernelOutcome {
        if local {
            if self.pending_clear == Some(client_seq) {
                self.pending_clear = None;
            }
            return KernelOutcome::Ignored;
        }
        if self.pending_clear.is_some() {
            return KernelOutcome::Ignored;
        }
        if !self.pending_keys.is_empty() {
            // Keys with in-flight local writes survive: their ops are
            // sequenced after this clear and re-assert the values on
            // every replica.
            let doomed: Vec<String> = self
                .storage
                .keys()
                .filter(|key| !self.pending_keys.contains_key(*key))
                .cloned()
                .collect();
            for key in doomed {
                self.storage.remove(&key);
            }
            return KernelOutcome::Cleared;
        }
        self.storage.clear();
        KernelOutcome::Cleared
    }

    /// Process a sequenced `act`. The handler context comes from the
    /// prepare phase.
    pub(crate) fn process_act(
        &mut self,
        key: &str,
        op: &ValueTypeOp,
        context: &serde_json::Value,
        local: bool,
        message: Option<&SequencedMessage>,
    ) -> KernelOutcome {
        if local {
            // Applied optimistically when the op was emitted.
            return KernelOutcome::Ignored;
        }
        if self.pending_clear.is_some() || self.pending_keys.contains_key(key) {
            return KernelOutcome::Ignored;
        }
        let Some(local_value) = self.storage.get_mut(key) else {
            debug!(key, "act for a missing key; dropped");
            return KernelOutcome::Ignored;
        };
        let Some(vt) = local_value.as_value_type_mut() else {
            warn!(key, "act targeted a non-value-type value; dropped");
            return KernelOutcome::Ignored;
        };
        let Some(handler) = vt.handler(&op.op_name) else {
            warn!(key, op_name = %op.op_name, "act named an unknown operation; dropped");
            return KernelOutcome::Ignored;
        };
        let previous = vt.view();
        if let Err(err) = handler.process(vt.value_mut(), &op.value, context, local, message) {
            warn!(key, error = %err, "value-type process failed; dropped");
            return KernelOutcome::Ignored;
        }
        KernelOutcome::ValueChanged { key: key.to_string(), previous_value: Some(previous) }
    }
}

impl Default for MapKernel {
    fn default() -> Self {
        Self::new()
    }
}
