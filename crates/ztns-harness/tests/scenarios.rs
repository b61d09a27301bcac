//! End-to-end simulator scenarios with scripted random draws.
//!
//! Every scenario uses [`ScriptedEnv`], so each failure, denial, spawn and
//! response-time draw is known and outcomes can be asserted exactly.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use ztns_core::{
    ClockState, ComponentId, ComponentKind, ComponentState, ConnectionCategory, ConnectionState,
    PacketKind, SimAction, Simulator, TopologySnapshot,
};
use ztns_harness::{InvariantRegistry, ScriptedEnv};

fn client_and_idp(env: &ScriptedEnv) -> (Simulator<ScriptedEnv>, ComponentId, ComponentId) {
    let mut sim = Simulator::with_defaults(env.clone());
    let a = sim.topology_mut().add_component(ComponentKind::Client, 0.0, 0.0).id().clone();
    let b = sim
        .topology_mut()
        .add_component(ComponentKind::IdentityProvider, 200.0, 100.0)
        .id()
        .clone();
    (sim, a, b)
}

#[test]
fn auth_packet_completes_in_fifty_ticks() {
    let env = ScriptedEnv::neutral();
    let (mut sim, a, b) = client_and_idp(&env);

    let connection = sim.topology_mut().add_connection(&a, &b).unwrap();
    assert_eq!(connection.category(), ConnectionCategory::Auth);
    assert_eq!(connection.state(), ConnectionState::Inactive);

    let packet_id = sim.spawn_packet(&a, &b, PacketKind::Auth).unwrap();
    sim.start();

    for tick in 1..50 {
        sim.tick();
        assert_eq!(sim.packets().len(), 1, "packet delivered early at tick {tick}");
    }

    let actions = sim.tick();
    assert!(sim.packets().is_empty());
    assert_eq!(actions, vec![SimAction::PacketDelivered { packet_id, response_time_ms: 50.0 }]);

    let metrics = sim.metrics();
    assert_eq!(metrics.total_packets, 1);
    assert_eq!(metrics.auth_requests, 1);
    assert_eq!(sim.metrics_detail().response_times().len(), 1);
    assert!((metrics.avg_response_time - 50.0).abs() < 1e-9);
}

#[test]
fn reversed_connection_is_not_duplicated() {
    let env = ScriptedEnv::neutral();
    let (mut sim, a, b) = client_and_idp(&env);

    assert!(sim.topology_mut().add_connection(&a, &b).is_some());
    assert!(sim.topology_mut().add_connection(&b, &a).is_none());
    assert_eq!(sim.topology().connection_count(), 1);
}

#[test]
fn removed_endpoint_leaves_no_position_and_no_panic() {
    let env = ScriptedEnv::neutral();
    let (mut sim, a, b) = client_and_idp(&env);
    sim.topology_mut().add_connection(&a, &b).unwrap();
    let packet_id = sim.spawn_packet(&a, &b, PacketKind::Request).unwrap();
    sim.start();
    sim.tick();

    sim.topology_mut().remove_component(&b);
    assert!(sim.packets()[0].position(sim.topology()).is_none());
    assert!(sim.packet_positions().is_empty());

    let actions = sim.tick();
    assert_eq!(actions, vec![SimAction::PacketDropped { packet_id }]);
    assert_eq!(sim.topology().connections()[0].state(), ConnectionState::Inactive);
    // Still counted as busy on the tick that discards the packet.
    assert_eq!(sim.topology().component(&a).unwrap().state(), ComponentState::Processing);

    sim.tick();
    assert_eq!(sim.topology().component(&a).unwrap().state(), ComponentState::Active);
}

#[test]
fn failure_draw_puts_target_in_error_for_one_tick() {
    let env = ScriptedEnv::with_draws([0.01]);
    let (mut sim, a, b) = client_and_idp(&env);
    sim.topology_mut().add_connection(&a, &b).unwrap();
    sim.spawn_packet(&a, &b, PacketKind::Request).unwrap();
    sim.start();

    let actions = sim.tick();
    assert_eq!(actions, vec![SimAction::AccessDenied { component: Some(b.clone()) }]);
    assert_eq!(sim.topology().component(&b).unwrap().state(), ComponentState::Error);
    assert_eq!(sim.metrics().denied_access, 1);

    // Packet keeps moving and the next neutral draw recovers.
    sim.tick();
    assert_eq!(sim.topology().component(&b).unwrap().state(), ComponentState::Processing);
    assert_eq!(sim.packets().len(), 1);
}

#[test]
fn automatic_spawn_uses_index_kind_and_denial_draws() {
    // Connection index, packet kind (0.1 * 3 -> request), denial (0.05 < 0.1).
    let env = ScriptedEnv::with_draws([0.9, 0.1, 0.05]);
    let (mut sim, a, b) = client_and_idp(&env);
    sim.topology_mut().add_connection(&a, &b).unwrap();
    sim.start();

    env.advance(Duration::from_millis(2001));
    let actions = sim.tick();

    assert_eq!(
        actions,
        vec![
            SimAction::PacketSpawned {
                packet_id: 0,
                source: a.clone(),
                target: b.clone(),
                kind: PacketKind::Request,
            },
            SimAction::AccessDenied { component: None },
        ]
    );
    assert_eq!(sim.metrics().total_packets, 1);
    assert_eq!(sim.metrics().auth_requests, 0);
    assert_eq!(sim.metrics().denied_access, 1);
    assert_eq!(env.remaining(), 0);
}

#[test]
fn spawn_interval_must_be_exceeded() {
    let env = ScriptedEnv::neutral();
    let (mut sim, a, b) = client_and_idp(&env);
    sim.topology_mut().add_connection(&a, &b).unwrap();
    sim.start();

    env.advance(Duration::from_millis(2000));
    assert!(sim.tick().is_empty());

    env.advance(Duration::from_millis(1));
    assert_eq!(sim.tick().len(), 1);

    // Timer restarts from the spawn.
    env.advance(Duration::from_millis(2000));
    assert!(sim.tick().iter().all(|a| !matches!(a, SimAction::PacketSpawned { .. })));
}

#[test]
fn average_covers_full_history() {
    let env = ScriptedEnv::neutral();
    let (mut sim, a, b) = client_and_idp(&env);
    sim.topology_mut().add_connection(&a, &b).unwrap();
    sim.spawn_packet(&a, &b, PacketKind::Request).unwrap();
    sim.spawn_packet(&a, &b, PacketKind::Response).unwrap();
    sim.start();

    for _ in 0..49 {
        sim.tick();
    }

    // Failure draw for the target, then one response draw per packet.
    env.push_draws([0.5, 0.2, 0.6]);
    let actions = sim.tick();

    assert_eq!(actions.len(), 2);
    assert_eq!(sim.metrics_detail().response_times(), &[20.0, 60.0]);
    assert!((sim.metrics().avg_response_time - 40.0).abs() < 1e-9);
    assert_eq!(sim.metrics().total_packets, 2);
    assert_eq!(sim.metrics().auth_requests, 0);
}

#[test]
fn lifecycle_pause_reset_keeps_topology() {
    let env = ScriptedEnv::neutral();
    let (mut sim, a, b) = client_and_idp(&env);
    sim.topology_mut().add_connection(&a, &b).unwrap();
    sim.spawn_packet(&a, &b, PacketKind::Auth).unwrap();
    sim.start();
    sim.tick();

    sim.pause();
    assert_eq!(sim.state(), ClockState::Paused);
    let progress = sim.packets()[0].progress();
    assert!(sim.tick().is_empty());
    assert!((sim.packets()[0].progress() - progress).abs() < f64::EPSILON);

    sim.reset();
    assert!(sim.packets().is_empty());
    assert_eq!(sim.metrics().total_packets, 0);
    assert_eq!(sim.topology().component_count(), 2);
    assert_eq!(sim.topology().connection_count(), 1);

    // A fresh start arms a fresh spawn timer.
    env.advance(Duration::from_secs(10));
    sim.start();
    assert!(sim.tick().is_empty());

    let (topology, metrics) = sim.dispose();
    assert_eq!(topology.component_count(), 2);
    assert_eq!(metrics.snapshot().total_packets, 0);
}

#[test]
fn idle_running_topology_is_active_with_gauge() {
    let env = ScriptedEnv::neutral();
    let (mut sim, a, b) = client_and_idp(&env);
    let c = sim.topology_mut().add_component(ComponentKind::PolicyEngine, 50.0, 300.0).id().clone();
    sim.topology_mut().add_connection(&a, &b).unwrap();
    sim.topology_mut().add_connection(&b, &c).unwrap();
    sim.start();
    sim.tick();

    assert!(sim.topology().components().iter().all(|c| c.state() == ComponentState::Active));
    assert!(sim.topology().connections().iter().all(|c| c.state() == ConnectionState::Inactive));
    assert_eq!(sim.metrics().active_connections, 2);
    assert_eq!(
        sim.topology().connection_between(&c, &b).unwrap().category(),
        ConnectionCategory::Policy
    );
}

#[test]
fn snapshot_restore_roundtrip() {
    let env = ScriptedEnv::neutral();
    let (mut sim, a, b) = client_and_idp(&env);
    sim.topology_mut().add_connection(&a, &b).unwrap();
    sim.spawn_packet(&a, &b, PacketKind::Auth).unwrap();
    sim.start();
    sim.tick();

    let bytes = sim.snapshot().encode().unwrap();
    let topology = TopologySnapshot::decode(&bytes).unwrap().into_topology().unwrap();
    sim.restore(topology);

    assert_eq!(sim.state(), ClockState::Paused);
    assert!(sim.packets().is_empty());
    assert_eq!(sim.metrics().total_packets, 1);
    assert_eq!(sim.topology().connection_count(), 1);
    assert!(sim.topology().components().iter().all(|c| c.state() == ComponentState::Inactive));
    assert_eq!(InvariantRegistry::standard().check_simulator(&sim), Ok(()));
}
