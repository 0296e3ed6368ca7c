/*
    Scenario tests for the shared map

    Test suite covering:
    - Reconciliation against the sequenced stream (shadowing, masking)
    - Replica convergence through the in-process sequencer
    - Snapshot partitioning and restoration
    - Detach / connect / resubmission
    - Pluggable value types end to end
*/

pub mod reconnect_tests;
pub mod snapshot_tests;
