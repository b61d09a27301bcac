//! Fuzz target for the simulation engine
//!
//! Replay arbitrary operation sequences and check the standard invariants
//! after every one of them.
//!
//! # Strategy
//!
//! - Topology churn: components added and removed mid-flight, leaving
//!   dangling connections and packets
//! - Clock probing: start, pause and reset in any order, with arbitrary
//!   virtual time between ticks
//! - Snapshot round-trips while packets are in flight
//!
//! # Invariants
//!
//! - Component ids are unique, connections are never duplicated
//! - In-flight packets stay in `[0, 1)` and ids follow spawn order
//! - The average response time is the mean of every sample
//! - Dangling connections are never active
//! - Paused ticks change nothing
//! - NEVER panic on any operation sequence

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use ztns_harness::{InvariantRegistry, Operation, SimWorld};

#[derive(Debug, Clone, Arbitrary)]
struct FuzzInput {
    /// Seed for the environment RNG.
    seed: u64,
    /// Operation sequence to replay.
    ops: Vec<Operation>,
}

fuzz_target!(|input: FuzzInput| {
    let registry = InvariantRegistry::standard();
    let mut world = SimWorld::new(input.seed);

    for (i, op) in input.ops.iter().enumerate() {
        let paused = !world.simulator().is_running();
        let before = world.observable_state();

        let _ = world.apply(op);

        if let Err(violations) = registry.check_simulator(world.simulator()) {
            panic!("Invariant violated after op {} ({:?}): {:?}", i, op, violations);
        }

        if paused && matches!(op, Operation::Tick { .. }) {
            assert_eq!(before, world.observable_state(), "Paused tick changed state");
        }
    }
});
