//! One remote CANopen node as seen from the VCU.
//!
//! Outbound calls (`send_nmt`, `sdo_write`, `send_pdo`, ...) go straight to
//! the transport from the caller's thread and never touch a lock. Inbound
//! frames land in the device inbox; the CANopen handler thread calls
//! [`CanOpenDevice::process`] to classify them, track the node's NMT state,
//! and route SDO/PDO payloads to their queues.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use thiserror::Error;
use tracing::{debug, warn};
use vcu_common::consts::{HEARTBEAT_COB_ID, SDO_RESPONSE_COB_ID};

use super::codec::{self, CodecError, Inbound, NmtCommand, NmtState, PdoMessage, SdoMessage};
use crate::can::{CanFrame, CanTransport, TransportError};
use crate::queue::{Queue, Timeout};

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub struct CanOpenDevice {
    transport: Arc<dyn CanTransport>,
    node_id: u8,
    pdo_bases: Vec<u32>,
    inbox: Queue<CanFrame>,
    sdo_rx: Queue<SdoMessage>,
    pdo_rx: Queue<PdoMessage>,
    nmt_state: AtomicU8,
    /// Boot-up messages seen since construction.
    boot_count: AtomicU32,
}

impl CanOpenDevice {
    /// Subscribe to the node's heartbeat, SDO responses and each TPDO in
    /// `pdo_bases`.
    pub fn new(
        transport: Arc<dyn CanTransport>,
        node_id: u8,
        pdo_bases: &[u32],
        capacity: usize,
    ) -> Result<Self, CodecError> {
        let node_id = codec::check_node(node_id)?;
        let inbox = Queue::bounded("canopen-inbox", capacity);

        transport.subscribe(HEARTBEAT_COB_ID + node_id as u32, inbox.clone());
        transport.subscribe(SDO_RESPONSE_COB_ID + node_id as u32, inbox.clone());
        for base in pdo_bases {
            transport.subscribe(base + node_id as u32, inbox.clone());
        }

        Ok(Self {
            transport,
            node_id,
            pdo_bases: pdo_bases.to_vec(),
            inbox,
            sdo_rx: Queue::bounded("canopen-sdo", capacity),
            pdo_rx: Queue::bounded("canopen-pdo", capacity),
            nmt_state: AtomicU8::new(NmtState::Unknown as u8),
            boot_count: AtomicU32::new(0),
        })
    }

    pub fn node_id(&self) -> u8 {
        self.node_id
    }

    // ─── Outbound ───────────────────────────────────────────────────

    pub fn send_nmt(&self, cmd: NmtCommand) -> Result<(), DeviceError> {
        self.transport.send(&codec::nmt(cmd, self.node_id)?)?;
        Ok(())
    }

    pub fn sdo_write(&self, index: u16, subindex: u8, data: &[u8]) -> Result<(), DeviceError> {
        self.transport
            .send(&codec::sdo_write(self.node_id, index, subindex, data)?)?;
        Ok(())
    }

    pub fn sdo_read(&self, index: u16, subindex: u8) -> Result<(), DeviceError> {
        self.transport
            .send(&codec::sdo_read(self.node_id, index, subindex)?)?;
        Ok(())
    }

    pub fn send_pdo(&self, base: u32, data: &[u8]) -> Result<(), DeviceError> {
        self.transport.send(&codec::pdo(base, self.node_id, data)?)?;
        Ok(())
    }

    // ─── Inbound ────────────────────────────────────────────────────

    /// Handle at most one inbound frame, waiting up to `timeout`.
    ///
    /// Returns the classified message, or `None` on timeout or for a frame
    /// that was dropped.
    pub fn process(&self, timeout: Timeout) -> Option<Inbound> {
        let frame = self.inbox.dequeue(timeout)?;
        let inbound = match codec::classify(&frame, self.node_id, &self.pdo_bases) {
            Ok(Some(inbound)) => inbound,
            Ok(None) => return None,
            Err(e) => {
                debug_assert!(false, "malformed CANopen frame: {e}");
                warn!(node = self.node_id, error = %e, "malformed frame dropped");
                return None;
            }
        };

        match inbound {
            Inbound::Heartbeat(state) => {
                if state == NmtState::Boot {
                    self.boot_count.fetch_add(1, Ordering::AcqRel);
                }
                let prev = self.nmt_state.swap(state as u8, Ordering::AcqRel);
                if prev != state as u8 {
                    debug!(node = self.node_id, ?state, "NMT state changed");
                }
            }
            Inbound::Sdo(msg) => {
                self.sdo_rx.enqueue(msg);
            }
            Inbound::Pdo(msg) => {
                self.pdo_rx.enqueue(msg);
            }
        }
        Some(inbound)
    }

    /// Handle everything already queued. Returns the number of frames consumed.
    pub fn process_pending(&self) -> usize {
        let mut n = 0;
        while !self.inbox.is_empty() {
            self.process(Timeout::Immediate);
            n += 1;
        }
        n
    }

    /// Last state the node reported in a heartbeat.
    pub fn nmt_state(&self) -> NmtState {
        NmtState::from_u8(self.nmt_state.load(Ordering::Acquire))
    }

    /// Number of boot-up messages received. Compare two readings to tell
    /// whether the node reset in between.
    pub fn boot_count(&self) -> u32 {
        self.boot_count.load(Ordering::Acquire)
    }

    pub fn sdo_queue(&self) -> &Queue<SdoMessage> {
        &self.sdo_rx
    }

    pub fn pdo_queue(&self) -> &Queue<PdoMessage> {
        &self.pdo_rx
    }
}
