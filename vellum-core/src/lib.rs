//! Vellum core - replicated shared containers
//!
//! The data layer of the Vellum collaborative runtime: a flat
//! [`SharedMap`] and a hierarchical [`SharedDirectory`] whose state is
//! replicated across clients through an external totally-ordered
//! operation log. Local mutations apply optimistically and converge
//! last-writer-wins once their echoes return; full state serializes to
//! partitioned blob snapshots.
//!
//! The ordering service, blob storage, and host runtime are consumed
//! behind the traits in [`core_protocol`] and [`core_runtime`].

pub mod core_directory;
pub mod core_events;
pub mod core_map;
pub mod core_protocol;
pub mod core_runtime;
pub mod core_values;
pub mod logging;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export commonly used types
pub use core_directory::{
    DirectoryError, DirectoryEvent, DirectoryResult, SharedDirectory, SubDirectoryCursor,
    SubDirectoryView,
};
pub use core_map::{ChunkingParams, MapError, MapEvent, MapResult, SharedMap};
pub use core_protocol::{DeltaConnection, Operation, SequencedMessage};
pub use core_runtime::{
    BlobStorage, ChannelAttributes, HandleContext, HandleRef, SnapshotTree,
};
pub use core_values::{MapValue, SerializableValue, ValueType, ValueTypeRegistry};
pub use logging::{init_logging, LogLevel};
