//! CANopen wire framing (CiA 301 subset).
//!
//! Pure functions: frame builders for NMT, SDO, PDO, SYNC and heartbeat,
//! and [`classify`] for inbound frames. No I/O, no state.
//!
//! | Kind | COB-ID | Len | Payload |
//! |------|--------|-----|---------|
//! | NMT | `0x000` | 2 | `[cmd, node]` |
//! | SYNC | `0x080` | 0 | — |
//! | Heartbeat | `0x700 + node` | 1 | `[state]` |
//! | SDO request | `0x600 + node` | 8 | `[hdr, idx lo, idx hi, sub, d0..d3]` |
//! | SDO response | `0x580 + node` | 8 | same layout |
//! | PDO | `base + node` | 8 | mapped data, zero padded |

use embedded_can::Frame as _;
use thiserror::Error;
use vcu_common::consts::{
    HEARTBEAT_COB_ID, MAX_NODE_ID, NMT_COB_ID, SDO_REQUEST_COB_ID, SDO_RESPONSE_COB_ID,
    SYNC_COB_ID,
};

use crate::can::CanFrame;

pub const SDO_FRAME_LEN: usize = 8;
pub const PDO_FRAME_LEN: usize = 8;
pub const SDO_MAX_EXPEDITED: usize = 4;

/// Client command specifier: initiate download (write).
const CCS_DOWNLOAD: u8 = 1;
/// Client command specifier: initiate upload (read).
const CCS_UPLOAD: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("node id {0} out of range [1, 127]")]
    NodeId(u8),
    #[error("expedited SDO carries 1..=4 bytes, got {0}")]
    SdoLength(usize),
    #[error("PDO payload of {0} bytes exceeds 8")]
    PdoLength(usize),
    #[error("COB-ID {0:#x} is not a standard identifier")]
    CobId(u32),
    #[error("frame {id:#x} has length {len}, expected {expected}")]
    Malformed { id: u32, len: usize, expected: usize },
}

// ─── NMT ────────────────────────────────────────────────────────────

/// NMT master commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NmtCommand {
    Operational = 0x01,
    Stopped = 0x02,
    PreOperational = 0x80,
    Reset = 0x81,
    ResetComms = 0x82,
}

/// Node state reported in heartbeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum NmtState {
    Boot = 0x00,
    Stopped = 0x04,
    Operational = 0x05,
    PreOperational = 0x7F,
    #[default]
    Unknown = 0xFF,
}

impl NmtState {
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0x00 => Self::Boot,
            0x04 => Self::Stopped,
            0x05 => Self::Operational,
            0x7F => Self::PreOperational,
            _ => Self::Unknown,
        }
    }
}

// ─── Messages ───────────────────────────────────────────────────────

/// Decoded SDO response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdoMessage {
    /// Raw command byte (server command specifier and size bits).
    pub command: u8,
    pub index: u16,
    pub subindex: u8,
    pub data: [u8; SDO_MAX_EXPEDITED],
}

/// PDO with its COB-ID normalized back to the base (node id removed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdoMessage {
    pub base: u32,
    pub len: u8,
    pub data: [u8; PDO_FRAME_LEN],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    Sdo(SdoMessage),
    Heartbeat(NmtState),
    Pdo(PdoMessage),
}

// ─── Builders ───────────────────────────────────────────────────────

pub fn check_node(node: u8) -> Result<u8, CodecError> {
    if node == 0 || node > MAX_NODE_ID {
        return Err(CodecError::NodeId(node));
    }
    Ok(node)
}

fn frame(id: u32, data: &[u8]) -> Result<CanFrame, CodecError> {
    CanFrame::standard(id, data).ok_or(CodecError::CobId(id))
}

#[inline]
const fn sdo_header(ccs: u8, n: u8, expedited: bool, size_indicated: bool) -> u8 {
    ((ccs & 0b111) << 5) | ((n & 0b11) << 2) | ((expedited as u8) << 1) | (size_indicated as u8)
}

pub fn nmt(cmd: NmtCommand, node: u8) -> Result<CanFrame, CodecError> {
    frame(NMT_COB_ID, &[cmd as u8, check_node(node)?])
}

pub fn sync() -> Result<CanFrame, CodecError> {
    frame(SYNC_COB_ID, &[])
}

pub fn heartbeat(node: u8, state: NmtState) -> Result<CanFrame, CodecError> {
    frame(HEARTBEAT_COB_ID + check_node(node)? as u32, &[state as u8])
}

/// Expedited SDO download of 1–4 bytes, little-endian as given.
pub fn sdo_write(node: u8, index: u16, subindex: u8, data: &[u8]) -> Result<CanFrame, CodecError> {
    if data.is_empty() || data.len() > SDO_MAX_EXPEDITED {
        return Err(CodecError::SdoLength(data.len()));
    }
    let n = (SDO_MAX_EXPEDITED - data.len()) as u8;
    let [lo, hi] = index.to_le_bytes();
    let mut buf = [0u8; SDO_FRAME_LEN];
    buf[0] = sdo_header(CCS_DOWNLOAD, n, true, true);
    buf[1] = lo;
    buf[2] = hi;
    buf[3] = subindex;
    buf[4..4 + data.len()].copy_from_slice(data);
    frame(SDO_REQUEST_COB_ID + check_node(node)? as u32, &buf)
}

/// SDO upload request; only the command specifier is set.
pub fn sdo_read(node: u8, index: u16, subindex: u8) -> Result<CanFrame, CodecError> {
    let [lo, hi] = index.to_le_bytes();
    let buf = [sdo_header(CCS_UPLOAD, 0, false, false), lo, hi, subindex, 0, 0, 0, 0];
    frame(SDO_REQUEST_COB_ID + check_node(node)? as u32, &buf)
}

/// PDO on `base + node`, payload zero-padded to 8 bytes.
pub fn pdo(base: u32, node: u8, data: &[u8]) -> Result<CanFrame, CodecError> {
    if data.len() > PDO_FRAME_LEN {
        return Err(CodecError::PdoLength(data.len()));
    }
    let mut buf = [0u8; PDO_FRAME_LEN];
    buf[..data.len()].copy_from_slice(data);
    frame(base + check_node(node)? as u32, &buf)
}

// ─── Classification ─────────────────────────────────────────────────

/// Classify a frame received for `node`.
///
/// - `Ok(Some(..))` for an SDO response, heartbeat, or PDO whose base is in
///   `pdo_bases`;
/// - `Ok(None)` for anything else (not ours, extended ids and remote
///   frames included; dropped silently);
/// - `Err(Malformed)` for an expected kind with the wrong length.
pub fn classify(frame: &CanFrame, node: u8, pdo_bases: &[u32]) -> Result<Option<Inbound>, CodecError> {
    if frame.is_extended() || frame.is_remote_frame() {
        return Ok(None);
    }
    let id = frame.raw_id();
    let node = node as u32;
    let Some(base) = id.checked_sub(node) else {
        return Ok(None);
    };
    let bytes = frame.bytes();

    if base == SDO_RESPONSE_COB_ID {
        expect_len(frame, SDO_FRAME_LEN)?;
        return Ok(Some(Inbound::Sdo(SdoMessage {
            command: bytes[0],
            index: u16::from_le_bytes([bytes[1], bytes[2]]),
            subindex: bytes[3],
            data: [bytes[4], bytes[5], bytes[6], bytes[7]],
        })));
    }

    if base == HEARTBEAT_COB_ID {
        expect_len(frame, 1)?;
        return Ok(Some(Inbound::Heartbeat(NmtState::from_u8(bytes[0]))));
    }

    if pdo_bases.contains(&base) {
        return Ok(Some(Inbound::Pdo(PdoMessage {
            base,
            len: frame.len() as u8,
            data: *bytes,
        })));
    }

    Ok(None)
}

fn expect_len(frame: &CanFrame, expected: usize) -> Result<(), CodecError> {
    if frame.len() != expected {
        return Err(CodecError::Malformed {
            id: frame.raw_id(),
            len: frame.len(),
            expected,
        });
    }
    Ok(())
}
