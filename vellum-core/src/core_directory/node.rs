/*
    node.rs - One node of the directory tree

    A node is a MapKernel (the node's own key storage plus its pending
    bookkeeping) together with the names of its children and the
    pending markers for in-flight subdirectory operations. Nodes live
    in the SharedDirectory's arena keyed by absolute path; parent
    identity is derived from the path, so there is no back pointer.
*/

use std::collections::HashMap;

use hashlink::LinkedHashSet;

use crate::core_map::MapKernel;

/// One node of the directory tree
pub(crate) struct DirNode {
    /// This node's own key storage and reconciliation state
    pub kernel: MapKernel,

    /// Child subdirectory names, in creation order
    pub children: LinkedHashSet<String>,

    /// Unacknowledged local create/delete per child name, by client
    /// sequence number
    pub pending_sub_dirs: HashMap<String, i64>,
}

impl DirNode {
    pub fn new() -> Self {
        DirNode {
            kernel: MapKernel::new(),
            children: LinkedHashSet::new(),
            pending_sub_dirs: HashMap::new(),
        }
    }

    pub fn mark_pending_sub_dir(&mut self, name: &str, client_seq: i64) {
        self.pending_sub_dirs.insert(name.to_string(), client_seq);
    }

    /// Local-echo bookkeeping for a subdirectory op
    pub fn ack_pending_sub_dir(&mut self, name: &str, client_seq: i64) {
        if self.pending_sub_dirs.get(name) == Some(&client_seq) {
            self.pending_sub_dirs.remove(name);
        }
    }

    pub fn has_pending_sub_dir(&self, name: &str) -> bool {
        self.pending_sub_dirs.contains_key(name)
    }
}

impl Default for DirNode {
    fn default() -> Self {
        Self::new()
    }
}
