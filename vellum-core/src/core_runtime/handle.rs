/*
    handle.rs - References to other shared objects

    A container value may reference another shared object by handle.
    The core only stores the reference; resolution and lifetime are the
    host's concern. When a container is registered with the host, every
    handle it stores is bound through the HandleContext so the
    referenced child objects get registered too.
*/

use serde::{Deserialize, Serialize};

/// A serialized reference to another shared object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleRef {
    /// Absolute URL of the referenced object within the host
    pub url: String,
}

impl HandleRef {
    pub fn new(url: impl Into<String>) -> Self {
        HandleRef { url: url.into() }
    }
}

/// Host-side registration of child shared objects
pub trait HandleContext: Send + Sync {
    /// Register the object behind `url` with the host
    fn bind(&self, url: &str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_handle_ref_wire_format() {
        let handle = HandleRef::new("/doc/annotations");
        let wire = serde_json::to_value(&handle).unwrap();
        assert_eq!(wire, json!({ "url": "/doc/annotations" }));
    }
}
