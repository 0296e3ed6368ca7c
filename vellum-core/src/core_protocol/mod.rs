/*
    core_protocol - Wire layer shared by every container

    Defines:
    - The operation variants exchanged through the ordering service
    - The sequenced message envelope delivered back to replicas
    - The connection trait used to submit local operations
*/

pub mod connection;
pub mod message;
pub mod ops;

pub use connection::{DeltaConnection, DETACHED_CLIENT_SEQUENCE_NUMBER};
pub use message::{SequencedMessage, MESSAGE_TYPE_OP};
pub use ops::{Operation, ValueTypeOp};
