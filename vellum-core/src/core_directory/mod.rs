/*
    core_directory - The replicated hierarchical key-value container

    A tree of nodes addressed by POSIX-style absolute paths. Each node
    mirrors the flat map's kernel semantics for its own key storage;
    the SharedDirectory owns the node arena and routes sequenced
    operations by type and path.
*/

pub mod cursor;
pub mod errors;
pub mod node;
pub mod path;
pub mod shared_directory;
pub mod snapshot;

#[cfg(test)]
pub mod tests;

pub use cursor::{SubDirectoryCursor, SubDirectoryView};
pub use errors::{DirectoryError, DirectoryResult};
pub use path::{posix_join, posix_resolve, ROOT_PATH};
pub use shared_directory::{DirectoryEvent, SharedDirectory};
pub use snapshot::DirectoryDataObject;
