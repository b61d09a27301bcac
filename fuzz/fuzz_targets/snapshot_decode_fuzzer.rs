//! Fuzz target for [`TopologySnapshot`] decoding
//!
//! Untrusted snapshot files must be rejected with an error, never a panic.
//!
//! # Invariants
//!
//! - `decode` + `into_topology` NEVER panic on arbitrary bytes
//! - A topology that was accepted re-encodes to identical bytes after a
//!   second round-trip

#![no_main]

use libfuzzer_sys::fuzz_target;
use ztns_core::TopologySnapshot;

fuzz_target!(|data: &[u8]| {
    let Ok(snapshot) = TopologySnapshot::decode(data) else {
        return;
    };
    let Ok(topology) = snapshot.into_topology() else {
        return;
    };

    let bytes = TopologySnapshot::capture(&topology).encode().unwrap();
    let again = TopologySnapshot::decode(&bytes).unwrap().into_topology().unwrap();

    // Byte comparison, since decoded positions may be NaN.
    assert_eq!(TopologySnapshot::capture(&again).encode().unwrap(), bytes);
});
