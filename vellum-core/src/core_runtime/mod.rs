/*
    core_runtime - Interfaces consumed from the host runtime

    The core never talks to storage or the host directly; it produces
    snapshot trees, reads named blobs through BlobStorage, and registers
    child object handles through HandleContext. Everything here is the
    seam between the containers and their host.
*/

pub mod attributes;
pub mod blob;
pub mod errors;
pub mod handle;

pub use attributes::{
    ChannelAttributes, DIRECTORY_CHANNEL_TYPE, DIRECTORY_SNAPSHOT_FORMAT_VERSION,
    MAP_CHANNEL_TYPE, MAP_SNAPSHOT_FORMAT_VERSION,
};
pub use blob::{BlobContents, BlobStorage, EntryType, FileMode, SnapshotTree, TreeEntry};
pub use errors::{SnapshotError, SnapshotResult};
pub use handle::{HandleContext, HandleRef};
