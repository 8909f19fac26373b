//! System-wide constants for the VCU workspace.
//!
//! CANopen identifiers are fixed by the bus layout. Timing and calibration
//! values here are the defaults behind every `#[serde(default)]` in
//! [`crate::vehicle::config`].

use static_assertions::const_assert;

// ─── CANopen Function Codes ─────────────────────────────────────────

/// NMT command frames are always sent on ID 0.
pub const NMT_COB_ID: u32 = 0x000;
/// SYNC producer ID.
pub const SYNC_COB_ID: u32 = 0x080;
/// Heartbeat base (`0x700 + node`).
pub const HEARTBEAT_COB_ID: u32 = 0x700;
/// SDO client → server base (`0x600 + node`).
pub const SDO_REQUEST_COB_ID: u32 = 0x600;
/// SDO server → client base (`0x580 + node`).
pub const SDO_RESPONSE_COB_ID: u32 = 0x580;

/// Largest valid CANopen node id.
pub const MAX_NODE_ID: u8 = 127;

/// Standard (11-bit) identifier mask.
pub const STANDARD_ID_MAX: u32 = 0x7FF;

const_assert!(HEARTBEAT_COB_ID + MAX_NODE_ID as u32 <= STANDARD_ID_MAX);
const_assert!(SDO_RESPONSE_COB_ID + (MAX_NODE_ID as u32) < SDO_REQUEST_COB_ID);

// ─── Inverter Object Dictionary ─────────────────────────────────────

/// CiA 402 control word.
pub const INVERTER_CONTROLWORD_INDEX: u16 = 0x6040;
pub const INVERTER_CONTROLWORD_SUBINDEX: u8 = 0x00;

/// Control word value that disables the power stage.
pub const INVERTER_CW_DISABLE_OUTPUT: u8 = 6;
/// Control word value that enables the power stage.
pub const INVERTER_CW_ENABLE_OUTPUT: u8 = 15;

pub const INVERTER_TPDO1: u32 = 0x180;
pub const INVERTER_TPDO2: u32 = 0x280;
pub const INVERTER_TPDO3: u32 = 0x380;
pub const INVERTER_TPDO4: u32 = 0x480;
/// Torque setpoint PDO (bytes 0–1, LE i16).
pub const INVERTER_RPDO1: u32 = 0x200;

// ─── Node IDs ───────────────────────────────────────────────────────

pub const VCU_NODE_ID: u8 = 5;
pub const INVERTER_NODE_ID: u8 = 1;

// ─── Torque ─────────────────────────────────────────────────────────

/// Upper bound of the inverter torque request scale (per-mille of rated).
pub const TORQUE_REQUEST_LIMIT: i16 = 1000;
/// Default positive torque ceiling.
pub const MAX_TORQUE_REQUEST_DEFAULT: i16 = 100;
/// Default regen floor.
pub const MIN_TORQUE_REQUEST_DEFAULT: i16 = -100;

// ─── Timing Defaults [ms] ───────────────────────────────────────────

pub const SUPERVISOR_TICK_MS: u64 = 10;
pub const INVERTER_TICK_MS: u64 = 10;
/// Minimum gap between repeated inverter boot-sequence commands.
pub const INVERTER_SEND_PERIOD_MS: u64 = 500;
pub const CANOPEN_HOST_PERIOD_MS: u64 = 50;
pub const TELEMETRY_PERIOD_MS: u64 = 100;
pub const BUS_POLL_PERIOD_MS: u64 = 5;

pub const CONTACTOR_CLOSE_TIMEOUT_MS: u64 = 10_000;
pub const BUZZER_DURATION_MS: u64 = 1_500;
pub const APPS_TIMEOUT_MS: u64 = 100;
pub const BRAKE_TIMEOUT_MS: u64 = 500;

// ─── Bus ────────────────────────────────────────────────────────────

/// Capacity of every per-subscriber frame queue.
pub const QUEUE_CAPACITY: usize = 256;
/// Max frames drained per bus wake-up.
pub const BUS_MAX_READS: usize = 15;

// ─── Analog Front End ───────────────────────────────────────────────

/// 12-bit ADC.
pub const ADC_RESOLUTION: u16 = 4096;
pub const ADC_FULL_SCALE_VOLTS: f32 = 1.8;

/// Moving-average window length for pedal channels.
pub const PEDAL_FILTER_WINDOW: usize = 8;
