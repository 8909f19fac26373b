//! Tractive-system state machine.
//!
//! ```text
//! Idle ─TSAS→ CloseContactors ─Active→ WaitR2D ─brake+start→ StartInverter
//!      ─inverter Drive→ Buzzer ─duration→ Driving
//! ```
//!
//! Any state falls back to `Idle` when the shutdown circuit opens, except
//! `Driving`, which goes to `Error`. `Error` is terminal.
//!
//! [`TractiveSupervisor::tick`] first runs the inverter fail-fast check
//! without taking the supervisor lock, then steps the state machine under
//! it. Telemetry reads through [`TractiveSupervisor::snapshot`].

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};
use vcu_common::prelude::*;
use vcu_common::vehicle::config::{RegenConfig, TractiveConfig};

use super::torque::{fraction_to_torque, gate, regen_permitted};
use crate::battery::Battery;
use crate::inverter::InverterControl;
use crate::io::{AnalogInput, DigitalIo};
use crate::plausibility::{PlausibilityMonitor, PowerLimiter, PowerSample};

/// Hardware and peer-module handles the supervisor drives.
#[derive(Clone)]
pub struct Collaborators {
    pub io: Arc<dyn DigitalIo>,
    pub adc: Arc<dyn AnalogInput>,
    pub battery: Arc<dyn Battery>,
    pub inverter: Arc<dyn InverterControl>,
}

/// State owned by the supervisor lock.
pub struct SupervisorCore {
    state: TsState,
    contactor_close_started: u64,
    buzzer_started: u64,
    monitor: PlausibilityMonitor,
    limiter: PowerLimiter,
    requested_torque: i16,
    regen_active: bool,
    sdc_closed: bool,
    last_tick_ms: Option<u64>,
    tick: u64,
}

impl SupervisorCore {
    #[inline]
    pub fn state(&self) -> TsState {
        self.state
    }

    pub fn requested_torque(&self) -> i16 {
        self.requested_torque
    }

    pub fn flags(&self) -> PlausibilityFlags {
        self.monitor.flags()
    }

    pub fn ticks(&self) -> u64 {
        self.tick
    }
}

pub struct TractiveSupervisor {
    cfg: TractiveConfig,
    regen: RegenConfig,
    default_tick_ms: u64,
    io: Arc<dyn DigitalIo>,
    adc: Arc<dyn AnalogInput>,
    battery: Arc<dyn Battery>,
    inverter: Arc<dyn InverterControl>,
    core: Mutex<SupervisorCore>,
}

impl TractiveSupervisor {
    pub fn new(cfg: &VcuConfig, hw: Collaborators) -> Self {
        let core = SupervisorCore {
            state: TsState::Idle,
            contactor_close_started: 0,
            buzzer_started: 0,
            monitor: PlausibilityMonitor::from_config(cfg),
            limiter: PowerLimiter::new(&cfg.power_limit),
            requested_torque: 0,
            regen_active: false,
            sdc_closed: false,
            last_tick_ms: None,
            tick: 0,
        };
        Self {
            cfg: cfg.tractive.clone(),
            regen: cfg.regen.clone(),
            default_tick_ms: cfg.timing.supervisor_tick_ms,
            io: hw.io,
            adc: hw.adc,
            battery: hw.battery,
            inverter: hw.inverter,
            core: Mutex::new(core),
        }
    }

    /// The supervisor lock. Held for one whole [`Self::tick`] step.
    pub fn lock(&self) -> MutexGuard<'_, SupervisorCore> {
        self.core.lock()
    }

    pub fn state(&self) -> TsState {
        self.core.lock().state
    }

    /// One consistent telemetry view, taken under the lock.
    pub fn snapshot(&self) -> VcuTelemetry {
        let core = self.core.lock();
        VcuTelemetry {
            ts_state: core.state,
            inverter_state: self.inverter.state(),
            contactor_status: self.battery.contactor_status(),
            sdc_closed: core.sdc_closed,
            plausibility: core.monitor.flags().bits(),
            regen_active: core.regen_active,
            requested_torque: core.requested_torque,
            apps_fraction: core.monitor.apps_fraction(),
            brake_raw: core.monitor.brake_raw(),
            tick: core.tick,
        }
    }

    /// One supervisor period.
    pub fn tick(&self, now_ms: u64) {
        // Fail-fast: must not wait on the supervisor lock.
        if self.inverter.state() == InverterState::Drive {
            let sdc_closed = self.io.sdc_closed();
            let contactors = self.battery.contactor_status();
            if !sdc_closed || contactors == ContactorStatus::Error {
                self.inverter.stop();
                error!(sdc_closed, ?contactors, "inverter stopped: drive path interrupted");
            }
        }

        // Status for the step is read under the lock.
        let mut core = self.core.lock();
        let sdc_closed = self.io.sdc_closed();
        let contactors = self.battery.contactor_status();
        self.step(&mut core, now_ms, sdc_closed, contactors);
    }

    fn step(&self, core: &mut SupervisorCore, now_ms: u64, sdc_closed: bool, contactors: ContactorStatus) {
        core.tick += 1;
        core.sdc_closed = sdc_closed;
        core.monitor.sample(self.adc.as_ref());

        if contactors == ContactorStatus::Error {
            self.battery.open_contactors();
            self.enter_error(core, "contactor error");
        }

        if !sdc_closed {
            self.battery.open_contactors();
            match core.state {
                TsState::Error | TsState::Idle => {}
                TsState::Driving => self.enter_error(core, "shutdown circuit opened while driving"),
                _ => self.enter_idle(core, "shutdown circuit opened"),
            }
        }

        match core.state {
            TsState::Idle => {
                if contactors == ContactorStatus::Ready && sdc_closed && self.io.tsas_pressed() {
                    self.battery.close_contactors();
                    core.contactor_close_started = now_ms;
                    self.transition(core, TsState::CloseContactors);
                }
            }
            TsState::CloseContactors => {
                if contactors == ContactorStatus::Active && sdc_closed {
                    self.transition(core, TsState::WaitR2D);
                } else if now_ms.saturating_sub(core.contactor_close_started)
                    > self.cfg.contactor_close_timeout_ms
                {
                    self.battery.open_contactors();
                    self.enter_error(core, "contactor close timed out");
                }
            }
            TsState::WaitR2D => {
                let braking = self.io.brake_applied() || core.monitor.brakes_on();
                if contactors == ContactorStatus::Active
                    && sdc_closed
                    && braking
                    && self.io.start_pressed()
                {
                    self.inverter.start();
                    self.transition(core, TsState::StartInverter);
                }
            }
            TsState::StartInverter => match self.inverter.state() {
                InverterState::Drive => {
                    self.io.set_buzzer(true);
                    core.buzzer_started = now_ms;
                    self.transition(core, TsState::Buzzer);
                }
                s if s.is_faulted() => self.enter_error(core, "inverter failed to start"),
                _ => {}
            },
            TsState::Buzzer => {
                if self.inverter.state().is_faulted() {
                    self.enter_error(core, "inverter fault during ready-to-drive");
                } else if now_ms.saturating_sub(core.buzzer_started) > self.cfg.buzzer_duration_ms {
                    self.io.set_buzzer(false);
                    self.io.set_r2d_led(true);
                    self.transition(core, TsState::Driving);
                }
            }
            TsState::Driving => {
                if self.inverter.state().is_faulted() {
                    self.enter_error(core, "inverter fault while driving");
                }
            }
            TsState::Error => {}
        }

        if core.state == TsState::Driving {
            self.drive(core, now_ms);
        } else {
            core.monitor.check(now_ms);
            core.requested_torque = 0;
            core.regen_active = false;
            self.io.set_r2d_led(false);
        }
        core.last_tick_ms = Some(now_ms);
    }

    /// Pedals → checked fraction → power limit → clamped, gated torque.
    fn drive(&self, core: &mut SupervisorCore, now_ms: u64) {
        let drive = core.monitor.torque_request_fraction(now_ms);
        let regen = core.monitor.brake_regen_fraction();
        let mut fraction = if drive > 0.0 { drive } else { drive.min(regen) };

        if core.limiter.is_enabled() {
            let sample = PowerSample {
                pack_voltage: self.battery.pack_voltage(),
                terminal_current: self.battery.terminal_current(),
                max_discharge_current: self.battery.max_discharge_current(),
                speed_rpm: self.inverter.feedback().speed_rpm as f32,
            };
            let dt_ms = core
                .last_tick_ms
                .map_or(self.default_tick_ms, |last| now_ms.saturating_sub(last));
            fraction = core.limiter.limit(fraction, &sample, dt_ms as f32 / 1000.0);
        }

        let regen_ok = regen_permitted(
            &self.regen,
            self.io.regen_switch(),
            self.battery.max_charge_current(),
        );
        let torque = fraction_to_torque(
            fraction,
            self.cfg.min_torque_request,
            self.cfg.max_torque_request,
        );
        let torque = gate(torque, core.monitor.flags(), regen_ok);

        core.requested_torque = torque;
        core.regen_active = torque < 0;
        self.inverter.send_torque(torque);
    }

    fn transition(&self, core: &mut SupervisorCore, to: TsState) {
        info!(from = ?core.state, ?to, "tractive system state");
        core.state = to;
    }

    fn enter_idle(&self, core: &mut SupervisorCore, reason: &'static str) {
        if matches!(core.state, TsState::StartInverter | TsState::Buzzer) {
            self.inverter.stop();
        }
        self.io.set_buzzer(false);
        self.io.set_r2d_led(false);
        core.limiter.reset();
        warn!(reason, from = ?core.state, "tractive system back to Idle");
        core.state = TsState::Idle;
    }

    /// Outputs off before the state is published.
    fn enter_error(&self, core: &mut SupervisorCore, reason: &'static str) {
        if core.state == TsState::Error {
            return;
        }
        core.requested_torque = 0;
        core.regen_active = false;
        self.io.set_r2d_led(false);
        self.io.set_buzzer(false);
        self.inverter.stop();
        error!(reason, from = ?core.state, "tractive system entered Error");
        core.state = TsState::Error;
        debug!(tick = core.tick, "supervisor halted");
    }
}
