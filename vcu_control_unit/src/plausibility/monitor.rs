//! Pedal plausibility monitor.
//!
//! Owns the four pedal channels (APPS1/2, brake pressure 1/2) and every
//! check on them. The supervisor calls [`PlausibilityMonitor::sample`] once
//! per tick, then [`PlausibilityMonitor::torque_request_fraction`], which
//! runs the checks and returns the only torque fraction it will act on.

use tracing::{info, warn};
use vcu_common::vehicle::config::{AppsConfig, BrakeConfig, HardBrakeConfig, RegenConfig, VcuConfig};
use vcu_common::vehicle::plausibility::PlausibilityFlags;

use super::channel::PedalChannel;
use super::checks::{AgreementCheck, HardBrakeCheck, RatioCheck};
use crate::io::AnalogInput;

pub struct PlausibilityMonitor {
    apps1: PedalChannel,
    apps2: PedalChannel,
    brake1: PedalChannel,
    brake2: PedalChannel,

    apps_agreement: AgreementCheck,
    brake_ratio: RatioCheck,
    hard_brake: HardBrakeCheck,

    brake_threshold1: u16,
    brake_threshold2: u16,
    regen: RegenConfig,

    flags: PlausibilityFlags,
}

impl PlausibilityMonitor {
    pub fn new(
        apps: &AppsConfig,
        brake: &BrakeConfig,
        hard_brake: &HardBrakeConfig,
        regen: &RegenConfig,
    ) -> Self {
        let apps_band = (apps.low_volts, apps.high_volts);
        let brake_band = (brake.low_volts, brake.high_volts);
        Self {
            apps1: PedalChannel::new(apps.apps1, apps.adc, apps.ignore_fraction, apps_band, apps.smoothing),
            apps2: PedalChannel::new(apps.apps2, apps.adc, apps.ignore_fraction, apps_band, apps.smoothing),
            brake1: PedalChannel::new(brake.brake1, brake.adc, 0.0, brake_band, false),
            brake2: PedalChannel::new(brake.brake2, brake.adc, 0.0, brake_band, false),
            apps_agreement: AgreementCheck::new(apps.tolerance, apps.timeout_ms),
            brake_ratio: RatioCheck::new(
                brake.ratio,
                brake.plausibility_fraction * f32::from(brake.adc.resolution),
                brake.timeout_ms,
            ),
            hard_brake: HardBrakeCheck::new(
                hard_brake.trip_fraction,
                hard_brake.release_fraction,
                hard_brake.timeout_ms,
            ),
            brake_threshold1: brake.threshold1_raw,
            brake_threshold2: brake.threshold2_raw,
            regen: regen.clone(),
            flags: PlausibilityFlags::empty(),
        }
    }

    pub fn from_config(cfg: &VcuConfig) -> Self {
        Self::new(&cfg.apps, &cfg.brake, &cfg.hard_brake, &cfg.regen)
    }

    /// Read all four channels for this tick.
    pub fn sample(&mut self, adc: &dyn AnalogInput) {
        for ch in [&mut self.apps1, &mut self.apps2, &mut self.brake1, &mut self.brake2] {
            let raw = adc.read(ch.adc_channel());
            ch.sample(raw);
        }
    }

    /// Run every check against the latest samples and publish the flags.
    pub fn check(&mut self, now_ms: u64) -> PlausibilityFlags {
        let prev = self.flags;
        let mut flags = PlausibilityFlags::empty();

        let apps_connected = self.apps1.is_connected() && self.apps2.is_connected();
        if !apps_connected {
            flags |= PlausibilityFlags::APPS_DISCONNECTED;
        } else if prev.contains(PlausibilityFlags::APPS_DISCONNECTED) {
            // Reseed smoothing from live values, not from the fault period.
            self.apps1.restart_filter();
            self.apps2.restart_filter();
        }

        if self
            .apps_agreement
            .update(self.apps1.instant_fraction(), self.apps2.instant_fraction(), now_ms)
        {
            flags |= PlausibilityFlags::APPS_DISAGREE;
        } else if prev.contains(PlausibilityFlags::APPS_DISAGREE) {
            self.apps1.restart_filter();
            self.apps2.restart_filter();
        }

        if !(self.brake1.is_connected() && self.brake2.is_connected()) {
            flags |= PlausibilityFlags::BRAKE_DISCONNECTED;
        }

        if self
            .brake_ratio
            .update(self.brake1.raw(), self.brake2.raw(), now_ms)
        {
            flags |= PlausibilityFlags::BRAKE_DISAGREE;
        }

        if self
            .hard_brake
            .update(self.apps1.instant_fraction(), self.brakes_on(), now_ms)
        {
            flags |= PlausibilityFlags::HARD_BRAKE;
        }

        log_edges(prev, flags);
        self.flags = flags;
        flags
    }

    /// Checked drive request in [-1, 1].
    ///
    /// Zero while any critical or hard-brake fault is active. Otherwise
    /// the smoothed APPS1 fraction, or lift-off regen (negative) when the
    /// pedal sits in its lower dead-band and regen is enabled.
    pub fn torque_request_fraction(&mut self, now_ms: u64) -> f32 {
        let flags = self.check(now_ms);
        if flags.blocks_torque() {
            return 0.0;
        }
        let apps = self.apps1.fraction();
        if apps > 0.0 {
            return apps;
        }
        if self.regen.enabled {
            -self.regen.lift_off_ratio.min(self.regen.max_ratio)
        } else {
            0.0
        }
    }

    /// Brake-pedal regen in [-max_ratio, 0], from the last checked flags.
    pub fn brake_regen_fraction(&self) -> f32 {
        if !self.regen.enabled || self.flags.blocks_torque() {
            return 0.0;
        }
        let pressure = self.brake1.fraction();
        if pressure <= self.regen.brake_start_fraction {
            return 0.0;
        }
        let span = self.regen.brake_full_fraction - self.regen.brake_start_fraction;
        if span <= f32::EPSILON {
            return -self.regen.max_ratio;
        }
        let scaled = ((pressure - self.regen.brake_start_fraction) / span).clamp(0.0, 1.0);
        -(scaled * self.regen.max_ratio)
    }

    /// Either brake pressure channel above its threshold.
    pub fn brakes_on(&self) -> bool {
        self.brake1.raw() > self.brake_threshold1 || self.brake2.raw() > self.brake_threshold2
    }

    #[inline]
    pub fn flags(&self) -> PlausibilityFlags {
        self.flags
    }

    pub fn is_critical(&self) -> bool {
        self.flags.has_critical()
    }

    /// Smoothed, dead-banded APPS1 fraction.
    pub fn apps_fraction(&self) -> f32 {
        self.apps1.fraction()
    }

    pub fn brake_raw(&self) -> u16 {
        self.brake1.raw()
    }
}

fn log_edges(prev: PlausibilityFlags, now: PlausibilityFlags) {
    let raised = now.difference(prev);
    let cleared = prev.difference(now);
    if !raised.is_empty() {
        warn!(flags = ?raised, "plausibility fault raised");
    }
    if !cleared.is_empty() {
        info!(flags = ?cleared, "plausibility fault cleared");
    }
}
