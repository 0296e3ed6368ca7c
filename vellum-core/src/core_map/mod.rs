/*
    core_map - The replicated flat key-value container

    One MapKernel holds the authoritative state and reconciliation for
    a single key-space; SharedMap is the facade wiring it to events,
    value types, the connection lifecycle, and snapshots.
*/

pub mod errors;
pub mod kernel;
pub mod shared_map;
pub mod snapshot;

#[cfg(test)]
pub mod tests;

pub use errors::{MapError, MapResult};
pub use kernel::MapKernel;
pub use shared_map::{MapEvent, SharedMap};
pub use snapshot::{ChunkingParams, HEADER_BLOB_NAME};
