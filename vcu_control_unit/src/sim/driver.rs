//! Scripted driver for the simulated build.
//!
//! Works through the ready-to-drive procedure by reacting to the
//! supervisor state, then sweeps the accelerator and brakes once per lap.

use tracing::info;
use vcu_common::vehicle::state::TsState;

use super::{SimAdc, SimIo};

/// Accelerator sweep period while driving [ms].
const LAP_MS: u64 = 8_000;

#[derive(Debug, Default)]
pub struct ScriptedDriver {
    last_state: Option<TsState>,
    driving_since: Option<u64>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set inputs for `state` at `now_ms`.
    pub fn step(&mut self, io: &SimIo, adc: &SimAdc, state: TsState, now_ms: u64) {
        if self.last_state != Some(state) {
            info!(?state, "driver sees");
            self.last_state = Some(state);
        }

        match state {
            TsState::Idle => {
                io.set_tsas(true);
                adc.set_apps(0.0);
                adc.set_brake(0.0);
            }
            TsState::CloseContactors => io.set_tsas(false),
            TsState::WaitR2D => {
                io.set_brake(true);
                adc.set_brake(0.4);
                io.set_start(true);
            }
            TsState::StartInverter | TsState::Buzzer => {
                io.set_start(false);
            }
            TsState::Driving => {
                io.set_brake(false);
                let since = *self.driving_since.get_or_insert(now_ms);
                let phase = (now_ms - since) % LAP_MS;
                let (apps, brake) = lap_profile(phase);
                adc.set_apps(apps);
                adc.set_brake(brake);
            }
            TsState::Error => {
                adc.set_apps(0.0);
                adc.set_brake(0.0);
            }
        }
    }
}

/// Ramp up, hold, lift, brake.
fn lap_profile(phase_ms: u64) -> (f32, f32) {
    let t = phase_ms as f32 / LAP_MS as f32;
    match t {
        t if t < 0.3 => (t / 0.3, 0.0),
        t if t < 0.5 => (1.0, 0.0),
        t if t < 0.7 => (0.0, 0.0),
        t if t < 0.9 => (0.0, 0.5),
        _ => (0.0, 0.0),
    }
}
