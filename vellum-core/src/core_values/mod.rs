/*
    core_values - Serialized and live container values

    Handles the three value kinds every container stores:
    - Plain: raw JSON payloads
    - Shared: handle references to other shared objects
    - Registered value types: live objects with their own operation
      handlers, mutated through `act` operations on the same log

    The registry materializes serialized values into live local values
    and back; the projection is a deterministic round trip.
*/

pub mod errors;
pub mod local_value;
pub mod registry;
pub mod serializable;
pub mod value_type;

pub use errors::{ValueError, ValueResult};
pub use local_value::{LocalValue, MapValue, ValueTypeLocalValue};
pub use registry::ValueTypeRegistry;
pub use serializable::{SerializableValue, PLAIN_VALUE_TYPE, SHARED_VALUE_TYPE};
pub use value_type::{ValueOpEmitter, ValueOpHandler, ValueOpSink, ValueType};
