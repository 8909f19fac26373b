//! Integration test: accelerator pedal faults cut torque without leaving
//! `Driving`, and torque returns when the pedals agree again.

use vcu_common::vehicle::config::VcuConfig;
use vcu_common::vehicle::plausibility::PlausibilityFlags;
use vcu_common::vehicle::state::TsState;

use super::support::{Rig, TICK_MS};

fn zero() -> Option<[u8; 2]> {
    Some(0i16.to_le_bytes())
}

#[test]
fn disagreement_zeroes_torque_after_timeout() {
    let mut rig = Rig::with_defaults();
    rig.drive_up();

    rig.world.adc.set_apps(0.5);
    rig.steps(20);
    assert_eq!(rig.last_torque_wire(), Some((-50i16).to_le_bytes()));

    // APPS2 reads 30 % travel less than APPS1.
    rig.world.adc.set_apps_split(0.8, 0.3);
    rig.steps(25);

    let snap = rig.world.supervisor.snapshot();
    assert!(snap.apps_plausibility());
    assert_eq!(snap.requested_torque, 0);
    assert_eq!(rig.last_torque_wire(), zero());
    assert_eq!(snap.ts_state, TsState::Driving);

    rig.world.adc.set_apps(0.5);
    rig.steps(20);
    let snap = rig.world.supervisor.snapshot();
    assert!(!snap.apps_plausibility());
    assert_eq!(snap.requested_torque, 50);
}

#[test]
fn eighty_twenty_split_trips_on_timeout_and_recovers_next_tick() {
    let cfg = VcuConfig::default();
    assert!(cfg.apps.smoothing);
    assert_eq!(cfg.apps.tolerance, 0.2);
    let timeout_ticks = (cfg.apps.timeout_ms / TICK_MS) as usize;

    let mut rig = Rig::new(cfg);
    rig.drive_up();
    rig.world.adc.set_apps(0.5);
    rig.steps(20);

    rig.world.adc.set_apps_split(0.8, 0.2);
    rig.step();
    let onset = rig.now;
    rig.steps(timeout_ticks - 1);
    let snap = rig.world.supervisor.snapshot();
    assert!(!snap.apps_plausibility(), "tripped early at {} ms", rig.now - onset);
    assert!(snap.requested_torque > 0);

    rig.step();
    let snap = rig.world.supervisor.snapshot();
    assert!(snap.apps_plausibility());
    assert_eq!(snap.requested_torque, 0);
    assert_eq!(rig.last_torque_wire(), zero());

    rig.steps(10);
    assert_eq!(rig.world.supervisor.snapshot().requested_torque, 0);

    rig.world.adc.set_apps(0.5);
    rig.step();
    let snap = rig.world.supervisor.snapshot();
    assert!(!snap.apps_plausibility());
    assert_eq!(snap.requested_torque, 50);
    assert_eq!(rig.last_torque_wire(), Some((-50i16).to_le_bytes()));
    assert_eq!(snap.ts_state, TsState::Driving);
}

#[test]
fn short_disagreement_is_tolerated() {
    let mut rig = Rig::with_defaults();
    rig.drive_up();
    rig.world.adc.set_apps(0.5);
    rig.steps(20);

    // Well under the 100 ms timeout, even with smoothing lag.
    rig.world.adc.set_apps_split(0.5, 0.0);
    rig.steps(3);
    rig.world.adc.set_apps(0.5);
    rig.steps(20);

    assert!(rig.world.supervisor.snapshot().flags().is_empty());
    assert_eq!(rig.world.supervisor.snapshot().requested_torque, 50);
}

#[test]
fn disconnected_sensor_zeroes_torque_immediately() {
    let mut rig = Rig::with_defaults();
    rig.drive_up();
    rig.world.adc.set_apps(0.5);
    rig.steps(20);

    rig.world.adc.disconnect_apps1();
    rig.step();

    let snap = rig.world.supervisor.snapshot();
    assert!(snap.flags().contains(PlausibilityFlags::APPS_DISCONNECTED));
    assert_eq!(snap.requested_torque, 0);
    assert_eq!(rig.last_torque_wire(), zero());
    assert_eq!(rig.ts_state(), TsState::Driving);
}

#[test]
fn hard_brake_cuts_throttle() {
    let mut rig = Rig::with_defaults();
    rig.drive_up();
    rig.world.adc.set_apps(0.6);
    rig.world.adc.set_brake(0.5);
    rig.steps(60);

    let snap = rig.world.supervisor.snapshot();
    assert!(snap.hard_brake());
    assert_eq!(snap.requested_torque, 0);

    // Throttle must drop below the release fraction before torque returns.
    rig.world.adc.set_brake(0.0);
    rig.world.adc.set_apps(0.5);
    rig.steps(20);
    assert!(rig.world.supervisor.snapshot().hard_brake());

    rig.world.adc.set_apps(0.0);
    rig.steps(20);
    rig.world.adc.set_apps(0.5);
    rig.steps(20);
    let snap = rig.world.supervisor.snapshot();
    assert!(!snap.hard_brake());
    assert_eq!(snap.requested_torque, 50);
}
