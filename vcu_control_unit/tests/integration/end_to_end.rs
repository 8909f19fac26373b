//! Integration test: ready-to-drive over the bus and torque on the wire.
//!
//! 1. TSAS → contactors close → WaitR2D
//! 2. Brake + start → inverter NMT/SDO boot sequence → buzzer → Driving
//! 3. 50 % APPS → torque 50, sent as -50 (inverted polarity)

use vcu_common::vehicle::state::{ContactorStatus, InverterState, TsState};
use vcu_control_unit::battery::Battery;
use vcu_control_unit::canopen::NmtState;
use vcu_control_unit::inverter::InverterControl;

use super::support::Rig;

const NMT: u32 = 0x000;
const SDO_REQ: u32 = 0x601;

#[test]
fn drive_up_sends_boot_sequence_in_order() {
    let mut rig = Rig::with_defaults();
    rig.drive_up();

    let boot: Vec<(u32, Vec<u8>)> = rig
        .world
        .loopback
        .sent()
        .iter()
        .filter(|f| f.raw_id() == NMT || f.raw_id() == SDO_REQ)
        .map(|f| (f.raw_id(), f.payload().to_vec()))
        .collect();
    assert_eq!(
        boot,
        vec![
            (NMT, vec![0x81, 1]),
            (NMT, vec![0x80, 1]),
            (NMT, vec![0x01, 1]),
            (SDO_REQ, vec![0x2B, 0x40, 0x60, 0x00, 6, 0, 0, 0]),
            (SDO_REQ, vec![0x2B, 0x40, 0x60, 0x00, 15, 0, 0, 0]),
        ]
    );

    assert!(rig.world.node.output_enabled());
    assert_eq!(rig.world.device.nmt_state(), NmtState::Operational);
    assert_eq!(rig.world.battery.contactor_status(), ContactorStatus::Active);
    assert!(rig.world.io.r2d_led());
}

#[test]
fn half_pedal_reaches_inverter_as_inverted_torque() {
    let mut rig = Rig::with_defaults();
    rig.drive_up();

    rig.world.adc.set_apps(0.5);
    rig.steps(20);

    assert_eq!(rig.last_torque_wire(), Some((-50i16).to_le_bytes()));
    assert_eq!(rig.world.node.wire_torque(), -50);
    assert_eq!(rig.world.node.applied_torque(), -50);
    let snap = rig.world.supervisor.snapshot();
    assert_eq!(snap.requested_torque, 50);
    assert_eq!(snap.ts_state, TsState::Driving);
    assert_eq!(snap.inverter_state, InverterState::Drive);
    assert!(snap.flags().is_empty());
}

#[test]
fn host_produces_sync_and_heartbeat() {
    let mut rig = Rig::with_defaults();
    rig.steps(20);
    assert!(!rig.world.loopback.sent_with_id(0x080).is_empty());
    let hb = rig.world.loopback.sent_with_id(0x705);
    assert!(!hb.is_empty());
    assert_eq!(hb[0].payload(), &[0x05]);
}

#[test]
fn inverter_reboot_while_driving_is_fatal() {
    let mut rig = Rig::with_defaults();
    rig.drive_up();

    rig.world.node.reboot();
    rig.steps(3);

    assert_eq!(rig.world.inverter.state(), InverterState::Error);
    assert_eq!(rig.ts_state(), TsState::Error);
    assert!(!rig.world.io.r2d_led());
}

#[test]
fn inverter_error_code_is_fatal() {
    let mut rig = Rig::with_defaults();
    rig.drive_up();

    rig.world.node.inject_error(0x2310);
    rig.steps(12);

    assert_eq!(rig.world.inverter.feedback().error_code, 0x2310);
    assert_eq!(rig.world.inverter.state(), InverterState::Error);
    assert_eq!(rig.ts_state(), TsState::Error);
}
