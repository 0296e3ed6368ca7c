/*
    connection.rs - Submission side of the ordering service

    Containers are created detached. While detached every submission is
    assigned DETACHED_CLIENT_SEQUENCE_NUMBER and queued; once a
    connection is installed the queued operations are re-driven through
    it in order.
*/

use super::ops::Operation;

/// Client sequence number reported for submissions made while detached
pub const DETACHED_CLIENT_SEQUENCE_NUMBER: i64 = -1;

/// A replica's connection to the ordering service
pub trait DeltaConnection: Send {
    /// Identifier of this client; used to recognize echoes of local ops
    fn client_id(&self) -> &str;

    /// Submit an operation payload, returning the assigned client
    /// sequence number
    fn submit(&mut self, contents: serde_json::Value) -> i64;
}

/// A locally-applied operation whose echo has not been observed yet.
/// Held by the facade for resubmission after a reconnect.
#[derive(Debug, Clone)]
pub(crate) struct PendingLocalOp {
    pub client_seq: i64,
    pub op: Operation,
}
