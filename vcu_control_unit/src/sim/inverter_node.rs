//! Simulated CANopen inverter on a loopback tap.
//!
//! Answers NMT commands with heartbeats, acknowledges control-word SDO
//! writes, accepts torque RPDOs while operational with the output enabled,
//! and publishes the status/feedback TPDOs on request.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};
use vcu_common::consts::{
    INVERTER_CONTROLWORD_INDEX, NMT_COB_ID, SDO_REQUEST_COB_ID,
    SDO_RESPONSE_COB_ID,
};
use vcu_common::vehicle::config::InverterConfig;

use crate::can::{CanFrame, Loopback};
use crate::canopen::codec::{self, NmtCommand, NmtState};
use crate::queue::{Queue, Timeout};

/// Speed gained per unit of applied torque, per publish.
const RPM_PER_TORQUE: i32 = 40;

#[derive(Debug, Default)]
struct Node {
    nmt: NmtState,
    control_word: u8,
    /// Last RPDO value, as seen on the wire.
    wire_torque: i16,
    applied_torque: i16,
    speed_rpm: i32,
    error_code: u16,
}

pub struct SimInverterNode {
    lb: Arc<Loopback>,
    rx: Queue<CanFrame>,
    cfg: InverterConfig,
    node: Mutex<Node>,
}

impl SimInverterNode {
    pub fn new(lb: Arc<Loopback>, cfg: &InverterConfig) -> Self {
        let rx = lb.tap();
        Self {
            lb,
            rx,
            cfg: cfg.clone(),
            node: Mutex::new(Node::default()),
        }
    }

    fn emit(&self, frame: Result<CanFrame, codec::CodecError>) {
        if let Ok(frame) = frame {
            self.lb.inject(frame);
        }
    }

    fn emit_heartbeat(&self, state: NmtState) {
        self.emit(codec::heartbeat(self.cfg.node_id, state));
    }

    /// Handle every frame the VCU has sent since the last poll.
    pub fn poll(&self) -> usize {
        let mut n = 0;
        while let Some(frame) = self.rx.dequeue(Timeout::Immediate) {
            self.handle(&frame);
            n += 1;
        }
        n
    }

    fn handle(&self, frame: &CanFrame) {
        let id = frame.raw_id();
        let node_id = u32::from(self.cfg.node_id);
        let data = frame.payload();

        if id == NMT_COB_ID && data.len() == 2 {
            if data[1] == self.cfg.node_id || data[1] == 0 {
                self.on_nmt(data[0]);
            }
        } else if id == SDO_REQUEST_COB_ID + node_id && data.len() == 8 {
            self.on_sdo(data);
        } else if id == self.cfg.torque_pdo + node_id && data.len() >= 2 {
            let raw = i16::from_le_bytes([data[0], data[1]]);
            let mut node = self.node.lock();
            node.wire_torque = raw;
            node.applied_torque = if node.nmt == NmtState::Operational
                && node.control_word == self.cfg.cw_enable_output
            {
                raw
            } else {
                0
            };
        }
    }

    fn on_nmt(&self, cmd: u8) {
        let next = match cmd {
            c if c == NmtCommand::Reset as u8 || c == NmtCommand::ResetComms as u8 => {
                {
                    let mut node = self.node.lock();
                    node.control_word = 0;
                    node.applied_torque = 0;
                    // Boot-up message now; the next heartbeat reports PreOp.
                    node.nmt = NmtState::PreOperational;
                }
                debug!("sim inverter reset");
                self.emit_heartbeat(NmtState::Boot);
                return;
            }
            c if c == NmtCommand::PreOperational as u8 => NmtState::PreOperational,
            c if c == NmtCommand::Operational as u8 => NmtState::Operational,
            c if c == NmtCommand::Stopped as u8 => NmtState::Stopped,
            _ => return,
        };
        {
            let mut node = self.node.lock();
            node.nmt = next;
            if next != NmtState::Operational {
                node.applied_torque = 0;
            }
        }
        debug!(state = ?next, "sim inverter NMT");
        self.emit_heartbeat(next);
    }

    fn on_sdo(&self, data: &[u8]) {
        let index = u16::from_le_bytes([data[1], data[2]]);
        let subindex = data[3];
        let is_write = data[0] & 0xE0 == 0x20;
        let mut reply = [0u8; 8];
        reply[1..4].copy_from_slice(&data[1..4]);

        if is_write {
            if index == INVERTER_CONTROLWORD_INDEX {
                let mut node = self.node.lock();
                node.control_word = data[4];
                if node.control_word != self.cfg.cw_enable_output {
                    node.applied_torque = 0;
                }
                info!(cw = node.control_word, "sim inverter control word");
            }
            reply[0] = 0x60;
        } else {
            reply[0] = 0x4B;
            if index == INVERTER_CONTROLWORD_INDEX && subindex == 0 {
                reply[4] = self.node.lock().control_word;
            }
        }
        let id = SDO_RESPONSE_COB_ID + u32::from(self.cfg.node_id);
        if let Some(frame) = CanFrame::standard(id, &reply) {
            self.lb.inject(frame);
        }
    }

    /// Heartbeat plus both TPDOs; speed follows the applied torque.
    pub fn publish(&self) {
        let (state, status, feedback) = {
            let mut node = self.node.lock();
            node.speed_rpm = (node.speed_rpm + i32::from(node.applied_torque) * RPM_PER_TORQUE)
                .clamp(-20_000, 20_000);
            let mut status = [0u8; 8];
            status[4..6].copy_from_slice(&node.error_code.to_le_bytes());
            let mut feedback = [0u8; 8];
            feedback[0..4].copy_from_slice(&node.speed_rpm.to_le_bytes());
            feedback[4..6].copy_from_slice(&40i16.to_le_bytes());
            feedback[6..8].copy_from_slice(&35i16.to_le_bytes());
            (node.nmt, status, feedback)
        };
        if state == NmtState::Unknown {
            return;
        }
        self.emit_heartbeat(state);
        self.emit(codec::pdo(self.cfg.status_pdo, self.cfg.node_id, &status));
        self.emit(codec::pdo(self.cfg.feedback_pdo, self.cfg.node_id, &feedback));
    }

    /// Report `code` in the status TPDO from the next publish on.
    pub fn inject_error(&self, code: u16) {
        self.node.lock().error_code = code;
    }

    /// Spontaneous reboot: boot-up heartbeat, then pre-operational.
    pub fn reboot(&self) {
        self.on_nmt(NmtCommand::Reset as u8);
    }

    pub fn nmt_state(&self) -> NmtState {
        self.node.lock().nmt
    }

    pub fn control_word(&self) -> u8 {
        self.node.lock().control_word
    }

    pub fn wire_torque(&self) -> i16 {
        self.node.lock().wire_torque
    }

    pub fn applied_torque(&self) -> i16 {
        self.node.lock().applied_torque
    }

    pub fn output_enabled(&self) -> bool {
        let node = self.node.lock();
        node.nmt == NmtState::Operational && node.control_word == self.cfg.cw_enable_output
    }
}
