/*
    attributes.rs - Channel identity and snapshot format versions

    The channel type URI tells the host which container implementation
    owns a channel; the snapshot format version is monotone on format
    change so loaders can dispatch.
*/

use serde::{Deserialize, Serialize};

/// Channel type URI for the shared map
pub const MAP_CHANNEL_TYPE: &str = "https://graph.microsoft.com/types/map";

/// Channel type URI for the shared directory
pub const DIRECTORY_CHANNEL_TYPE: &str = "https://graph.microsoft.com/types/directory";

/// Snapshot format written by the shared map (chunked header)
pub const MAP_SNAPSHOT_FORMAT_VERSION: &str = "0.2";

/// Snapshot format written by the shared directory (whole-tree header)
pub const DIRECTORY_SNAPSHOT_FORMAT_VERSION: &str = "0.1";

/// Identity attributes of a registered channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAttributes {
    #[serde(rename = "type")]
    pub channel_type: String,

    #[serde(rename = "snapshotFormatVersion")]
    pub snapshot_format_version: String,
}

impl ChannelAttributes {
    /// Attributes of a shared map channel
    pub fn map() -> Self {
        ChannelAttributes {
            channel_type: MAP_CHANNEL_TYPE.to_string(),
            snapshot_format_version: MAP_SNAPSHOT_FORMAT_VERSION.to_string(),
        }
    }

    /// Attributes of a shared directory channel
    pub fn directory() -> Self {
        ChannelAttributes {
            channel_type: DIRECTORY_CHANNEL_TYPE.to_string(),
            snapshot_format_version: DIRECTORY_SNAPSHOT_FORMAT_VERSION.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_attributes() {
        let attrs = ChannelAttributes::map();
        assert_eq!(attrs.channel_type, "https://graph.microsoft.com/types/map");
        assert_eq!(attrs.snapshot_format_version, "0.2");
    }

    #[test]
    fn test_directory_attributes() {
        let attrs = ChannelAttributes::directory();
        assert_eq!(attrs.channel_type, "https://graph.microsoft.com/types/directory");
        assert_eq!(attrs.snapshot_format_version, "0.1");
    }
}
