//! State enums for the tractive system, the inverter and the battery.
//!
//! All enums use `#[repr(u8)]` so they can be stored in atomics and packed
//! into telemetry frames without a lookup table.

use serde::{Deserialize, Serialize};

// ─── Tractive System ────────────────────────────────────────────────

/// Top-level vehicle state owned by the tractive-system supervisor.
///
/// Torque is only forwarded to the inverter in `Driving`. `Error` is
/// terminal: nothing leaves it short of a process restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TsState {
    Error = 0,
    /// HV off, waiting for the TS-activation switch.
    Idle = 1,
    /// Contactor close requested, precharge running.
    CloseContactors = 2,
    /// HV live, waiting for brake + start.
    WaitR2D = 3,
    /// Inverter boot sequence requested.
    StartInverter = 4,
    /// Ready-to-drive sound playing.
    Buzzer = 5,
    Driving = 6,
}

impl TsState {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Error),
            1 => Some(Self::Idle),
            2 => Some(Self::CloseContactors),
            3 => Some(Self::WaitR2D),
            4 => Some(Self::StartInverter),
            5 => Some(Self::Buzzer),
            6 => Some(Self::Driving),
            _ => None,
        }
    }
}

impl Default for TsState {
    fn default() -> Self {
        Self::Idle
    }
}

// ─── Inverter ───────────────────────────────────────────────────────

/// Boot/enable state of the motor inverter as tracked by the VCU.
///
/// Only `Drive` means "ready for torque".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum InverterState {
    Unknown = 0,
    Error = 1,
    Reset = 2,
    PreOp = 3,
    Op = 4,
    /// Operational, power stage disabled.
    Idle = 5,
    /// Power stage enabled.
    Drive = 6,
}

impl InverterState {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unknown),
            1 => Some(Self::Error),
            2 => Some(Self::Reset),
            3 => Some(Self::PreOp),
            4 => Some(Self::Op),
            5 => Some(Self::Idle),
            6 => Some(Self::Drive),
            _ => None,
        }
    }

    /// States the supervisor treats as a failed inverter.
    #[inline]
    pub const fn is_faulted(self) -> bool {
        matches!(self, Self::Error | Self::Unknown)
    }
}

impl Default for InverterState {
    fn default() -> Self {
        Self::Unknown
    }
}

// ─── Battery ────────────────────────────────────────────────────────

/// Contactor status reported by the battery management system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ContactorStatus {
    Init = 0,
    /// Awaiting ignition.
    Ready = 1,
    /// Precharging.
    AwaitActive = 2,
    /// Contactors closed.
    Active = 3,
    Error = 4,
}

impl ContactorStatus {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Init),
            1 => Some(Self::Ready),
            2 => Some(Self::AwaitActive),
            3 => Some(Self::Active),
            4 => Some(Self::Error),
            _ => None,
        }
    }
}

impl Default for ContactorStatus {
    fn default() -> Self {
        Self::Init
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ts_state_u8_round_trip() {
        for v in 0..=6u8 {
            assert_eq!(TsState::from_u8(v).unwrap() as u8, v);
        }
        assert_eq!(TsState::from_u8(7), None);
    }

    #[test]
    fn inverter_fault_classification() {
        assert!(InverterState::Error.is_faulted());
        assert!(InverterState::Unknown.is_faulted());
        assert!(!InverterState::Drive.is_faulted());
        assert!(!InverterState::PreOp.is_faulted());
        assert_eq!(InverterState::from_u8(9), None);
    }

    #[test]
    fn defaults() {
        assert_eq!(TsState::default(), TsState::Idle);
        assert_eq!(InverterState::default(), InverterState::Unknown);
        assert_eq!(ContactorStatus::default(), ContactorStatus::Init);
    }

    #[test]
    fn contactor_status_round_trip() {
        for v in 0..=4u8 {
            assert_eq!(ContactorStatus::from_u8(v).unwrap() as u8, v);
        }
        assert_eq!(ContactorStatus::from_u8(200), None);
    }
}
