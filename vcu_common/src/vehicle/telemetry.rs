//! Read-only telemetry snapshot.
//!
//! Produced by the tractive-system supervisor on demand and handed to the
//! logging/display side. Consumers never get a handle that can mutate
//! supervisor state.

use serde::{Deserialize, Serialize};

use super::plausibility::PlausibilityFlags;
use super::state::{ContactorStatus, InverterState, TsState};

/// One consistent view of the vehicle, taken under the supervisor lock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VcuTelemetry {
    pub ts_state: TsState,
    pub inverter_state: InverterState,
    pub contactor_status: ContactorStatus,
    /// Shutdown circuit closed at the last tick.
    pub sdc_closed: bool,
    /// Raw [`PlausibilityFlags`] bits.
    pub plausibility: u8,
    /// Regen permitted and requested on the last tick.
    pub regen_active: bool,
    /// Torque sent on the last tick (0 outside `Driving`).
    pub requested_torque: i16,
    /// Smoothed APPS fraction [0, 1].
    pub apps_fraction: f32,
    /// Raw brake channel 1 ADC code.
    pub brake_raw: u16,
    /// Supervisor ticks executed.
    pub tick: u64,
}

impl VcuTelemetry {
    #[inline]
    pub fn flags(&self) -> PlausibilityFlags {
        PlausibilityFlags::from_bits_truncate(self.plausibility)
    }

    pub fn apps_disconnected(&self) -> bool {
        self.flags().contains(PlausibilityFlags::APPS_DISCONNECTED)
    }

    pub fn apps_plausibility(&self) -> bool {
        self.flags().contains(PlausibilityFlags::APPS_DISAGREE)
    }

    pub fn brake_disconnected(&self) -> bool {
        self.flags().contains(PlausibilityFlags::BRAKE_DISCONNECTED)
    }

    pub fn brake_plausibility(&self) -> bool {
        self.flags().contains(PlausibilityFlags::BRAKE_DISAGREE)
    }

    pub fn hard_brake(&self) -> bool {
        self.flags().contains(PlausibilityFlags::HARD_BRAKE)
    }
}

impl Default for VcuTelemetry {
    fn default() -> Self {
        Self {
            ts_state: TsState::default(),
            inverter_state: InverterState::default(),
            contactor_status: ContactorStatus::default(),
            sdc_closed: false,
            plausibility: 0,
            regen_active: false,
            requested_torque: 0,
            apps_fraction: 0.0,
            brake_raw: 0,
            tick: 0,
        }
    }
}
