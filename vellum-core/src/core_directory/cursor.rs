/*
    cursor.rs - Scoped access to one directory node

    Nodes live in the SharedDirectory's arena; cursors carry the
    owner together with an absolute path. SubDirectoryView reads,
    SubDirectoryCursor also mutates, and navigation consumes the
    cursor so chains like create("a")?.create("b")?.set(...) borrow
    the owner exactly once.
*/

use super::errors::DirectoryResult;
use super::path::posix_resolve;
use super::shared_directory::SharedDirectory;
use crate::core_values::{MapValue, ValueOpEmitter};

/// Read-only access to one node of a shared directory
pub struct SubDirectoryView<'a> {
    dir: &'a SharedDirectory,
    path: String,
}

impl<'a> SubDirectoryView<'a> {
    pub(crate) fn new(dir: &'a SharedDirectory, path: String) -> Self {
        SubDirectoryView { dir, path }
    }

    /// This node's absolute path from the root
    pub fn absolute_path(&self) -> &str {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<MapValue> {
        self.dir.get_at(&self.path, key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.dir.node(&self.path).map_or(0, |node| node.kernel.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// This node's own keys, in insertion order; descendants are not
    /// included
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.dir.node(&self.path).into_iter().flat_map(|node| node.kernel.keys())
    }

    /// This node's own (key, value) pairs, in insertion order
    pub fn entries(&self) -> impl Iterator<Item = (&str, MapValue)> {
        self.dir.node(&self.path).into_iter().flat_map(|node| node.kernel.entries())
    }

    /// Names of this node's children, in creation order
    pub fn sub_directories(&self) -> impl Iterator<Item = &str> {
        self.dir
            .node(&self.path)
            .into_iter()
            .flat_map(|node| node.children.iter().map(String::as_str))
    }

    pub fn has_sub_directory(&self, name: &str) -> bool {
        self.dir
            .node(&self.path)
            .is_some_and(|node| node.children.contains(name))
    }

    /// Descend into a direct child
    pub fn get_sub_directory(self, name: &str) -> Option<SubDirectoryView<'a>> {
        self.working_directory(name)
    }

    /// Resolve a relative or absolute path against this node
    pub fn working_directory(self, target: &str) -> Option<SubDirectoryView<'a>> {
        let absolute = posix_resolve(&self.path, target);
        self.dir
            .node(&absolute)
            .is_some()
            .then(|| SubDirectoryView::new(self.dir, absolute))
    }
}

/// Mutating access to one node of a shared directory
pub struct SubDirectoryCursor<'a> {
    dir: &'a mut SharedDirectory,
    path: String,
}

impl<'a> std::fmt::Debug for SubDirectoryCursor<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubDirectoryCursor")
            .field("path", &self.path)
            .finish()
    }
}

impl<'a> SubDirectoryCursor<'a> {
    pub(crate) fn new(dir: &'a mut SharedDirectory, path: String) -> Self {
        SubDirectoryCursor { dir, path }
    }

    /// This node's absolute path from the root
    pub fn absolute_path(&self) -> &str {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<MapValue> {
        self.dir.get_at(&self.path, key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.dir.node(&self.path).map_or(0, |node| node.kernel.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_sub_directory(&self, name: &str) -> bool {
        self.dir
            .node(&self.path)
            .is_some_and(|node| node.children.contains(name))
    }

    /// Store a value under a key at this node
    pub fn set(&mut self, key: &str, value: impl Into<MapValue>) -> DirectoryResult<()> {
        self.dir.set_at(&self.path, key, value.into())
    }

    /// Remove a key, returning whether it existed locally
    pub fn delete(&mut self, key: &str) -> DirectoryResult<bool> {
        self.dir.delete_at(&self.path, key)
    }

    /// Remove every key of this node; children are untouched
    pub fn clear(&mut self) -> DirectoryResult<()> {
        self.dir.clear_at(&self.path)
    }

    /// Create a value of a registered value type under a key
    pub fn create_value_type(
        &mut self,
        key: &str,
        type_name: &str,
        params: serde_json::Value,
    ) -> DirectoryResult<()> {
        self.dir.create_value_type_at(&self.path, key, type_name, params)
    }

    /// Emitter for value-type operations on the value under `key`
    pub fn value_op_emitter(&mut self, key: &str) -> ValueOpEmitter<'_> {
        ValueOpEmitter::new(self.dir, Some(self.path.clone()), key)
    }

    /// Create (or return) a child subdirectory and descend into it
    pub fn create_sub_directory(self, name: &str) -> DirectoryResult<SubDirectoryCursor<'a>> {
        let child_path = self.dir.create_sub_directory_at(&self.path, name)?;
        Ok(SubDirectoryCursor::new(self.dir, child_path))
    }

    /// Delete a child subdirectory and its whole subtree.
    ///
    /// No events fire for the dropped descendants.
    pub fn delete_sub_directory(&mut self, name: &str) -> DirectoryResult<bool> {
        self.dir.delete_sub_directory_at(&self.path, name)
    }

    /// Descend into a direct child
    pub fn get_sub_directory(self, name: &str) -> Option<SubDirectoryCursor<'a>> {
        self.working_directory(name)
    }

    /// Resolve a relative or absolute path against this node
    pub fn working_directory(self, target: &str) -> Option<SubDirectoryCursor<'a>> {
        let absolute = posix_resolve(&self.path, target);
        if self.dir.node(&absolute).is_none() {
            return None;
        }
        Some(SubDirectoryCursor::new(self.dir, absolute))
    }
}
