//! Integration test: contactor faults.
//!
//! A precharge that never completes opens the contactors and latches
//! `Error` after the close timeout; a contactor error while driving stops
//! the inverter on the same tick.

use vcu_common::vehicle::state::{ContactorStatus, InverterState, TsState};
use vcu_control_unit::battery::Battery;
use vcu_control_unit::canopen::NmtState;
use vcu_control_unit::inverter::InverterControl;

use super::support::Rig;

#[test]
fn stuck_precharge_times_out_into_error() {
    let mut rig = Rig::with_defaults();
    rig.world.battery.set_stuck(true);
    rig.world.io.set_tsas(true);
    rig.step();
    assert_eq!(rig.ts_state(), TsState::CloseContactors);
    let started = rig.now;
    let opens = rig.world.battery.open_requests();

    rig.run_until(11_000, "contactor timeout", |w| w.supervisor.state() == TsState::Error);

    let elapsed = rig.now - started;
    assert!((10_000..=10_020).contains(&elapsed), "{elapsed}");
    assert!(rig.world.battery.open_requests() > opens);
    assert_eq!(rig.world.battery.contactor_status(), ContactorStatus::Ready);
    // The inverter was never asked to start.
    assert!(!rig.world.inverter.is_enabled());
    assert_ne!(rig.world.inverter.state(), InverterState::Drive);

    // Error is terminal.
    rig.world.battery.set_stuck(false);
    rig.steps(200);
    assert_eq!(rig.ts_state(), TsState::Error);
}

#[test]
fn contactor_error_while_driving_stops_inverter() {
    let mut rig = Rig::with_defaults();
    rig.drive_up();
    rig.world.adc.set_apps(0.5);
    rig.steps(20);

    rig.world.battery.set_status(ContactorStatus::Error);
    rig.step();

    assert_eq!(rig.ts_state(), TsState::Error);
    assert_eq!(rig.world.inverter.state(), InverterState::PreOp);
    assert!(!rig.world.inverter.is_enabled());
    rig.steps(2);
    assert_eq!(rig.world.node.nmt_state(), NmtState::PreOperational);
    assert_eq!(rig.world.node.applied_torque(), 0);
}
