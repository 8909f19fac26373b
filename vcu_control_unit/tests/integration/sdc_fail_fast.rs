//! Integration test: the shutdown circuit opening while driving stops the
//! inverter even when the supervisor lock is held elsewhere.
//!
//! 1. Drive up, hold the supervisor lock from the test thread
//! 2. Open the SDC and tick the supervisor on another thread
//! 3. NMT PreOp + control word 6 reach the bus while the tick is still
//!    blocked on the lock
//! 4. Release the lock: the tick completes and latches `Error`

use std::sync::Arc;
use std::time::{Duration, Instant};

use vcu_common::vehicle::state::{ContactorStatus, InverterState, TsState};
use vcu_control_unit::battery::Battery;
use vcu_control_unit::canopen::NmtState;
use vcu_control_unit::inverter::InverterControl;

use super::support::{Rig, TICK_MS};

const NMT: u32 = 0x000;
const SDO_REQ: u32 = 0x601;

#[test]
fn inverter_stops_while_supervisor_lock_is_held() {
    let mut rig = Rig::with_defaults();
    rig.drive_up();
    rig.world.adc.set_apps(0.5);
    rig.steps(20);
    rig.world.loopback.take_sent();

    let supervisor = Arc::clone(&rig.world.supervisor);
    let guard = supervisor.lock();
    rig.world.io.set_sdc(false);

    let now = rig.now + TICK_MS;
    let ticker = {
        let supervisor = Arc::clone(&supervisor);
        std::thread::spawn(move || supervisor.tick(now))
    };

    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        let sent = rig.world.loopback.sent();
        let nmt_preop = sent
            .iter()
            .any(|f| f.raw_id() == NMT && f.payload() == &[0x80, 1]);
        let cw_disable = sent
            .iter()
            .any(|f| f.raw_id() == SDO_REQ && f.payload()[4] == 6);
        if nmt_preop && cw_disable && rig.world.inverter.state() == InverterState::PreOp {
            break;
        }
        assert!(Instant::now() < deadline, "inverter stop waited on the supervisor lock");
        std::thread::sleep(Duration::from_millis(1));
    }
    assert!(!ticker.is_finished(), "tick finished while the lock was held");

    drop(guard);
    ticker.join().unwrap();
    rig.now = now;

    assert_eq!(rig.ts_state(), TsState::Error);
    let snap = rig.world.supervisor.snapshot();
    assert_eq!(snap.requested_torque, 0);
    assert!(!snap.sdc_closed);
    assert!(!rig.world.io.r2d_led());

    // The node itself sees the stop.
    rig.steps(2);
    assert_eq!(rig.world.node.nmt_state(), NmtState::PreOperational);
    assert!(!rig.world.node.output_enabled());
    assert_eq!(rig.world.battery.contactor_status(), ContactorStatus::Ready);
}

#[test]
fn sdc_open_before_ready_to_drive_returns_to_idle() {
    let mut rig = Rig::with_defaults();
    rig.world.io.set_tsas(true);
    rig.run_until(2_000, "WaitR2D", |w| w.supervisor.state() == TsState::WaitR2D);
    rig.world.io.set_tsas(false);

    rig.world.io.set_sdc(false);
    rig.step();
    assert_eq!(rig.ts_state(), TsState::Idle);
    assert_eq!(rig.world.battery.contactor_status(), ContactorStatus::Ready);

    // Closing the circuit again allows a fresh start.
    rig.world.io.set_sdc(true);
    rig.world.io.set_tsas(true);
    rig.run_until(2_000, "WaitR2D again", |w| w.supervisor.state() == TsState::WaitR2D);
}
