//! Model-based property tests.
//!
//! Random byte strings are decoded into operation sequences and applied to
//! a real simulator over a seeded environment.
//!
//! ```text
//! proptest generates: (seed, bytes)
//!                          │
//!                  Unstructured → Vec<Operation>
//!                          │
//!           ┌──────────────┴──────────────┐
//!           ▼                             ▼
//!      SimWorld(seed)               SimWorld(seed)
//!      invariants after each op     same ops
//!           └──────────── compare ────────┘
//! ```

#![allow(clippy::unwrap_used)]

use arbitrary::{Arbitrary, Unstructured};
use proptest::prelude::*;
use ztns_harness::{InvariantRegistry, ObservableState, Operation, SimWorld};

/// Decode as many operations as the bytes allow.
fn decode_operations(bytes: &[u8]) -> Vec<Operation> {
    let mut u = Unstructured::new(bytes);
    let mut ops = Vec::new();
    while !u.is_empty() {
        match Operation::arbitrary(&mut u) {
            Ok(op) => ops.push(op),
            Err(_) => break,
        }
    }
    ops
}

fn run(seed: u64, ops: &[Operation]) -> ObservableState {
    let mut world = SimWorld::new(seed);
    for op in ops {
        let _ = world.apply(op);
    }
    world.observable_state()
}

/// Strategy biased towards a populated, running topology.
fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        4 => (any::<u8>(), any::<u16>(), any::<u16>())
            .prop_map(|(kind, x, y)| Operation::AddComponent { kind, x, y }),
        4 => (any::<u8>(), any::<u8>())
            .prop_map(|(source, target)| Operation::AddConnection { source, target }),
        1 => any::<u8>().prop_map(|index| Operation::RemoveComponent { index }),
        3 => (any::<u8>(), any::<u8>(), any::<u8>())
            .prop_map(|(source, target, kind)| Operation::SpawnPacket { source, target, kind }),
        2 => Just(Operation::Start),
        1 => Just(Operation::Pause),
        1 => Just(Operation::Reset),
        5 => any::<u8>().prop_map(|count| Operation::Tick { count }),
        3 => any::<u16>().prop_map(|millis| Operation::AdvanceTime { millis }),
        1 => Just(Operation::SnapshotRoundtrip),
    ]
}

proptest! {
    /// Invariants hold after every operation of a weighted sequence.
    #[test]
    fn prop_invariants_hold(
        seed in any::<u64>(),
        ops in prop::collection::vec(operation_strategy(), 0..120)
    ) {
        let registry = InvariantRegistry::standard();
        let mut world = SimWorld::new(seed);

        for (i, op) in ops.iter().enumerate() {
            let _ = world.apply(op);
            let result = registry.check_simulator(world.simulator());
            prop_assert!(
                result.is_ok(),
                "Violation after operation {}: {:?}\n{:?}",
                i, op, result
            );
        }
    }

    /// Invariants hold for operations decoded from raw bytes.
    #[test]
    fn prop_invariants_hold_for_raw_bytes(
        seed in any::<u64>(),
        bytes in prop::collection::vec(any::<u8>(), 0..1024)
    ) {
        let registry = InvariantRegistry::standard();
        let mut world = SimWorld::new(seed);

        for op in decode_operations(&bytes) {
            let _ = world.apply(&op);
            prop_assert_eq!(registry.check_simulator(world.simulator()), Ok(()));
        }
    }

    /// Same seed and operations produce the same observable state.
    #[test]
    fn prop_same_seed_is_deterministic(
        seed in any::<u64>(),
        ops in prop::collection::vec(operation_strategy(), 0..80)
    ) {
        let first = run(seed, &ops);
        let second = run(seed, &ops);
        prop_assert_eq!(first, second);
    }

    /// Reset zeroes the metrics but never touches the topology.
    #[test]
    fn prop_reset_keeps_topology(
        seed in any::<u64>(),
        ops in prop::collection::vec(operation_strategy(), 0..80)
    ) {
        let mut world = SimWorld::new(seed);
        for op in &ops {
            let _ = world.apply(op);
        }

        let before = world.observable_state();
        let _ = world.apply(&Operation::Reset);
        let after = world.observable_state();

        prop_assert_eq!(&before.components, &after.components);
        prop_assert_eq!(&before.connections, &after.connections);
        prop_assert!(after.packets.is_empty());
        prop_assert_eq!(after.metrics.total_packets, 0);
        prop_assert_eq!(after.metrics.denied_access, 0);
    }

    /// Paused ticks never change anything.
    #[test]
    fn prop_paused_ticks_are_noops(
        seed in any::<u64>(),
        ops in prop::collection::vec(operation_strategy(), 0..60),
        count in any::<u8>()
    ) {
        let mut world = SimWorld::new(seed);
        for op in &ops {
            let _ = world.apply(op);
        }
        let _ = world.apply(&Operation::Pause);

        let before = world.observable_state();
        let _ = world.apply(&Operation::AdvanceTime { millis: u16::MAX });
        let _ = world.apply(&Operation::Tick { count });
        prop_assert_eq!(before, world.observable_state());
    }
}
