//! Test utilities for the shared containers
//!
//! Fixtures shared across the test suites: an in-process ordering
//! service, an in-memory blob store, a counter value type, and
//! assertion helpers.

pub mod assertions;
pub mod counter;
pub mod sequencer;
pub mod storage;

pub use assertions::*;
pub use counter::*;
pub use sequencer::*;
pub use storage::*;
