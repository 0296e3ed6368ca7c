/*
    Scenario tests for the shared directory

    Test suite covering:
    - Tree navigation, path resolution, subdirectory lifecycle
    - Node-scoped reconciliation mirroring the flat map
    - Whole-tree snapshots
*/

pub mod snapshot_tests;
