//! Assertion helpers shared by the test suites

use std::fmt::Debug;

use crate::core_map::SharedMap;
use crate::core_values::MapValue;

/// Assert that a Result is Ok and return the value
pub fn assert_ok<T, E: Debug>(result: Result<T, E>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!("Expected Ok, got Err: {e:?}"),
    }
}

/// Assert that an Option is Some and return the value
pub fn assert_some<T>(option: Option<T>) -> T {
    match option {
        Some(value) => value,
        None => panic!("Expected Some, got None"),
    }
}

/// Assert two maps hold identical entries in identical order
pub fn assert_converged(a: &SharedMap, b: &SharedMap) {
    let entries_a: Vec<(&str, MapValue)> = a.entries().collect();
    let entries_b: Vec<(&str, MapValue)> = b.entries().collect();
    assert_eq!(entries_a, entries_b, "replicas diverged");
}
