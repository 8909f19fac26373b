//! Inverter boot/enable state machine over CANopen.
//!
//! ```text
//! Unknown ─Reset→ Reset ─PreOp→ PreOp ─(enable) Op→ Op ─CW disable→ Idle ─(enable) CW enable→ Drive
//! ```
//!
//! Each command-sending step waits out `send_period_ms` since the previous
//! command. The state lives in an atomic so [`InverterControl::stop`] can
//! publish `PreOp` without the lock; the periodic [`InverterSupervisor::tick`]
//! advances with compare-exchange so it never overwrites a concurrent stop.
//! `Error` is terminal.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};
use vcu_common::consts::{INVERTER_CONTROLWORD_INDEX, INVERTER_CONTROLWORD_SUBINDEX};
use vcu_common::vehicle::config::InverterConfig;
use vcu_common::vehicle::state::InverterState;

use super::{InverterControl, InverterFeedback};
use crate::canopen::{CanOpenDevice, DeviceError, NmtCommand};
use crate::queue::Timeout;

/// Lock-protected part of the supervisor.
#[derive(Debug, Default)]
struct Shared {
    enable: bool,
    last_tx_ms: Option<u64>,
    /// Device boot count when the sequence last reached `Idle`.
    boots_at_idle: u32,
    feedback: InverterFeedback,
}

impl Shared {
    fn period_elapsed(&self, now_ms: u64, period_ms: u64) -> bool {
        self.last_tx_ms
            .is_none_or(|last| now_ms.saturating_sub(last) > period_ms)
    }
}

pub struct InverterSupervisor {
    device: Arc<CanOpenDevice>,
    cfg: InverterConfig,
    state: AtomicU8,
    shared: Mutex<Shared>,
}

impl InverterSupervisor {
    pub fn new(device: Arc<CanOpenDevice>, cfg: &InverterConfig) -> Self {
        Self {
            device,
            cfg: cfg.clone(),
            state: AtomicU8::new(InverterState::Unknown as u8),
            shared: Mutex::new(Shared::default()),
        }
    }

    pub fn device(&self) -> &Arc<CanOpenDevice> {
        &self.device
    }

    /// Compare-exchange `from → to`. Fails if someone else moved the state.
    fn advance(&self, from: InverterState, to: InverterState) -> bool {
        let ok = self
            .state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if ok {
            info!(?from, ?to, "inverter state");
        }
        ok
    }

    fn fault(&self, reason: &str) {
        let prev = self.state.swap(InverterState::Error as u8, Ordering::AcqRel);
        if prev != InverterState::Error as u8 {
            error!(reason, "inverter entered Error");
        }
    }

    fn control_word(&self, value: u8) -> Result<(), DeviceError> {
        self.device.sdo_write(
            INVERTER_CONTROLWORD_INDEX,
            INVERTER_CONTROLWORD_SUBINDEX,
            &[value, 0],
        )
    }

    fn log_send(result: Result<(), DeviceError>, what: &'static str) {
        if let Err(e) = result {
            warn!(what, error = %e, "inverter command not sent");
        }
    }

    /// One supervisor period: advance the boot sequence and fold in any
    /// received TPDO/SDO data.
    pub fn tick(&self, now_ms: u64) {
        use InverterState::*;

        let mut shared = self.shared.lock();
        let period = self.cfg.send_period_ms;

        match self.state() {
            Unknown => {
                if shared.period_elapsed(now_ms, period) {
                    debug!("inverter: reset from Unknown");
                    Self::log_send(self.device.send_nmt(NmtCommand::Reset), "nmt reset");
                    self.advance(Unknown, Reset);
                    shared.last_tx_ms = Some(now_ms);
                }
            }
            Reset => {
                if shared.period_elapsed(now_ms, period) {
                    debug!("inverter: pre-operational from Reset");
                    Self::log_send(
                        self.device.send_nmt(NmtCommand::PreOperational),
                        "nmt pre-operational",
                    );
                    self.advance(Reset, PreOp);
                    shared.last_tx_ms = Some(now_ms);
                }
            }
            PreOp => {
                if shared.enable {
                    debug!("inverter: operational");
                    Self::log_send(
                        self.device.send_nmt(NmtCommand::Operational),
                        "nmt operational",
                    );
                    self.advance(PreOp, Op);
                    shared.last_tx_ms = Some(now_ms);
                }
            }
            Op => {
                if shared.period_elapsed(now_ms, period) {
                    debug!("inverter: disable output from Op");
                    Self::log_send(self.control_word(self.cfg.cw_disable_output), "cw disable");
                    shared.boots_at_idle = self.device.boot_count();
                    self.advance(Op, Idle);
                    shared.last_tx_ms = Some(now_ms);
                }
            }
            Idle => {
                if shared.enable && shared.period_elapsed(now_ms, period) {
                    debug!("inverter: enable output");
                    Self::log_send(self.control_word(self.cfg.cw_enable_output), "cw enable");
                    if !self.advance(Idle, Drive) {
                        // A stop landed between the read and the enable word.
                        Self::log_send(self.control_word(self.cfg.cw_disable_output), "cw disable");
                    }
                    shared.last_tx_ms = Some(now_ms);
                }
            }
            Drive => {
                if !shared.enable {
                    debug!("inverter: disable output from Drive");
                    Self::log_send(self.control_word(self.cfg.cw_disable_output), "cw disable");
                    self.advance(Drive, Idle);
                }
            }
            Error => {}
        }

        while let Some(sdo) = self.device.sdo_queue().dequeue(Timeout::Immediate) {
            debug!(index = sdo.index, subindex = sdo.subindex, data = ?sdo.data, "inverter SDO reply");
        }

        while let Some(pdo) = self.device.pdo_queue().dequeue(Timeout::Immediate) {
            if pdo.base == self.cfg.status_pdo {
                let before = shared.feedback.error_code;
                shared.feedback.apply_status(&pdo);
                if shared.feedback.error_code != before && shared.feedback.error_code != 0 {
                    error!(code = shared.feedback.error_code, "inverter error code");
                }
            } else if pdo.base == self.cfg.feedback_pdo {
                shared.feedback.apply_feedback(&pdo);
            }
        }

        if shared.feedback.error_code != 0 {
            self.fault("device error code");
        }

        // A boot-up message after the sequence finished means the node
        // reset underneath us.
        if matches!(self.state(), Idle | Drive) && self.device.boot_count() != shared.boots_at_idle {
            self.fault("unexpected node reset");
        }
    }

    /// Encode `torque × polarity` as the RPDO payload (LE i16).
    pub fn torque_payload(&self, torque: i16) -> [u8; 2] {
        let signed = (i32::from(torque) * i32::from(self.cfg.torque_polarity))
            .clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
        signed.to_le_bytes()
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.lock().enable
    }
}

impl InverterControl for InverterSupervisor {
    #[inline]
    fn state(&self) -> InverterState {
        InverterState::from_u8(self.state.load(Ordering::Acquire)).unwrap_or(InverterState::Error)
    }

    fn start(&self) {
        self.shared.lock().enable = true;
        info!("inverter start requested");
    }

    fn stop(&self) {
        Self::log_send(
            self.device.send_nmt(NmtCommand::PreOperational),
            "stop: nmt pre-operational",
        );
        Self::log_send(self.control_word(self.cfg.cw_disable_output), "stop: cw disable");

        let published = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
                (s != InverterState::Error as u8).then_some(InverterState::PreOp as u8)
            })
            .is_ok();
        if published {
            warn!("inverter stopped");
        }

        self.shared.lock().enable = false;
    }

    fn send_torque(&self, torque: i16) {
        let payload = self.torque_payload(torque);
        Self::log_send(self.device.send_pdo(self.cfg.torque_pdo, &payload), "torque pdo");
    }

    fn feedback(&self) -> InverterFeedback {
        self.shared.lock().feedback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::can::{CanBus, CanFrame, Loopback};

    const NMT: u32 = 0x000;
    const SDO_REQ: u32 = 0x601;

    fn setup() -> (Arc<Loopback>, Arc<CanBus<Loopback>>, InverterSupervisor) {
        let lb = Arc::new(Loopback::new(64));
        let bus = Arc::new(CanBus::new(lb.clone(), 15));
        let cfg = InverterConfig::default();
        let dev = CanOpenDevice::new(bus.clone(), cfg.node_id, &cfg.tpdo_bases, 64).unwrap();
        let inv = InverterSupervisor::new(Arc::new(dev), &cfg);
        (lb, bus, inv)
    }

    fn boot_to_drive(inv: &InverterSupervisor) -> u64 {
        let mut t = 0;
        inv.start();
        while inv.state() != InverterState::Drive {
            inv.tick(t);
            t += 10;
            assert!(t < 10_000, "boot stalled in {:?}", inv.state());
        }
        t
    }

    #[test]
    fn boot_sequence_frames_in_order() {
        let (lb, _bus, inv) = setup();
        boot_to_drive(&inv);

        let sent: Vec<(u32, Vec<u8>)> = lb
            .sent()
            .iter()
            .map(|f| (f.raw_id(), f.payload().to_vec()))
            .collect();
        assert_eq!(
            sent,
            vec![
                (NMT, vec![0x81, 1]),
                (NMT, vec![0x80, 1]),
                (NMT, vec![0x01, 1]),
                (SDO_REQ, vec![0x2B, 0x40, 0x60, 0x00, 6, 0, 0, 0]),
                (SDO_REQ, vec![0x2B, 0x40, 0x60, 0x00, 15, 0, 0, 0]),
            ]
        );
    }

    #[test]
    fn boot_steps_are_rate_limited() {
        let (lb, _bus, inv) = setup();
        inv.tick(0);
        assert_eq!(inv.state(), InverterState::Reset);
        for t in (10..=500).step_by(10) {
            inv.tick(t);
        }
        assert_eq!(inv.state(), InverterState::Reset);
        inv.tick(510);
        assert_eq!(inv.state(), InverterState::PreOp);
        assert_eq!(lb.sent().len(), 2);
    }

    #[test]
    fn waits_in_preop_until_started() {
        let (_lb, _bus, inv) = setup();
        for t in (0..3_000).step_by(10) {
            inv.tick(t);
        }
        assert_eq!(inv.state(), InverterState::PreOp);
        inv.start();
        inv.tick(3_000);
        assert_eq!(inv.state(), InverterState::Op);
    }

    #[test]
    fn stop_from_drive() {
        let (lb, _bus, inv) = setup();
        boot_to_drive(&inv);
        lb.take_sent();

        inv.stop();
        assert_eq!(inv.state(), InverterState::PreOp);
        assert!(!inv.is_enabled());
        let sent = lb.sent();
        assert_eq!(sent[0].payload(), &[0x80, 1]);
        assert_eq!(sent[1].payload()[4], 6);
    }

    #[test]
    fn stop_is_sent_while_lock_is_held() {
        let (lb, _bus, inv) = setup();
        let inv = Arc::new(inv);
        boot_to_drive(&inv);
        lb.take_sent();

        let guard = inv.shared.lock();
        let stopper = {
            let inv = inv.clone();
            std::thread::spawn(move || inv.stop())
        };
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
        while inv.state() != InverterState::PreOp || lb.sent().len() < 2 {
            assert!(std::time::Instant::now() < deadline, "stop blocked on lock");
            std::thread::yield_now();
        }
        assert!(!stopper.is_finished());
        drop(guard);
        stopper.join().unwrap();
        assert!(!inv.is_enabled());
    }

    #[test]
    fn error_code_is_terminal() {
        let (lb, bus, inv) = setup();
        boot_to_drive(&inv);

        lb.inject(CanFrame::standard(0x181, &[0, 0, 0, 0, 0x10, 0x00, 0, 0]).unwrap());
        bus.pump().unwrap();
        inv.device().process_pending();
        inv.tick(20_000);
        assert_eq!(inv.state(), InverterState::Error);
        assert_eq!(inv.feedback().error_code, 0x10);

        inv.stop();
        assert_eq!(inv.state(), InverterState::Error);
        inv.start();
        inv.tick(30_000);
        assert_eq!(inv.state(), InverterState::Error);
    }

    fn deliver(lb: &Loopback, bus: &CanBus<Loopback>, inv: &InverterSupervisor, frame: CanFrame) {
        lb.inject(frame);
        bus.pump().unwrap();
        inv.device().process_pending();
    }

    #[test]
    fn silent_node_after_boot_up_reaches_drive() {
        let (lb, bus, inv) = setup();
        inv.tick(0);
        assert_eq!(inv.state(), InverterState::Reset);
        // Boot-up answer to the reset; heartbeat producer disabled, so
        // nothing else ever arrives.
        deliver(&lb, &bus, &inv, CanFrame::standard(0x701, &[0x00]).unwrap());

        inv.start();
        for t in (10..5_000).step_by(10) {
            inv.tick(t);
        }
        assert_eq!(inv.state(), InverterState::Drive);
    }

    #[test]
    fn boot_up_after_enable_is_fatal() {
        let (lb, bus, inv) = setup();
        let t = boot_to_drive(&inv);
        deliver(&lb, &bus, &inv, CanFrame::standard(0x701, &[0x00]).unwrap());
        inv.tick(t);
        assert_eq!(inv.state(), InverterState::Error);
    }

    #[test]
    fn torque_sign_inverted_on_wire() {
        let (lb, _bus, inv) = setup();
        inv.send_torque(50);
        let f = lb.sent_with_id(0x201);
        assert_eq!(f.len(), 1);
        assert_eq!(&f[0].payload()[..2], &(-50i16).to_le_bytes());
        assert_eq!(inv.torque_payload(i16::MIN), i16::MAX.to_le_bytes());
    }

    #[test]
    fn feedback_pdo_decoded() {
        let (lb, bus, inv) = setup();
        let rpm = 4_200i32.to_le_bytes();
        lb.inject(
            CanFrame::standard(0x281, &[rpm[0], rpm[1], rpm[2], rpm[3], 40, 0, 35, 0]).unwrap(),
        );
        bus.pump().unwrap();
        inv.device().process_pending();
        inv.tick(0);
        let fb = inv.feedback();
        assert_eq!(fb.speed_rpm, 4_200);
        assert_eq!((fb.motor_temp, fb.controller_temp), (40, 35));
    }
}
