//! Pedal sensor front end backed by atomics.
//!
//! Tests and the scripted driver set pedal travel; the helpers invert the
//! channel calibration so the supervisor reads the matching raw codes.

use std::sync::atomic::{AtomicU16, Ordering};

use vcu_common::vehicle::config::{AdcConfig, ChannelCalibration, VcuConfig};

use crate::io::AnalogInput;
use crate::plausibility::channel::raw_for_fraction;

pub const SIM_ADC_CHANNELS: usize = 8;

#[derive(Debug)]
pub struct SimAdc {
    channels: [AtomicU16; SIM_ADC_CHANNELS],
    apps: [ChannelCalibration; 2],
    apps_adc: AdcConfig,
    brakes: [ChannelCalibration; 2],
    brake_adc: AdcConfig,
}

impl SimAdc {
    /// Both pedals released.
    pub fn new(cfg: &VcuConfig) -> Self {
        let adc = Self {
            channels: Default::default(),
            apps: [cfg.apps.apps1, cfg.apps.apps2],
            apps_adc: cfg.apps.adc,
            brakes: [cfg.brake.brake1, cfg.brake.brake2],
            brake_adc: cfg.brake.adc,
        };
        adc.set_apps(0.0);
        adc.set_brake(0.0);
        adc
    }

    pub fn set_raw(&self, channel: u8, raw: u16) {
        if let Some(ch) = self.channels.get(usize::from(channel)) {
            ch.store(raw, Ordering::Release);
        }
    }

    fn set_fraction(&self, cal: &ChannelCalibration, fraction: f32, adc: &AdcConfig) {
        self.set_raw(cal.adc_channel, raw_for_fraction(fraction, cal, adc));
    }

    /// Both APPS channels at the same calibrated travel.
    pub fn set_apps(&self, fraction: f32) {
        self.set_apps_split(fraction, fraction);
    }

    /// Independent travel per APPS channel.
    pub fn set_apps_split(&self, apps1: f32, apps2: f32) {
        self.set_fraction(&self.apps[0], apps1, &self.apps_adc);
        self.set_fraction(&self.apps[1], apps2, &self.apps_adc);
    }

    /// Both pressure channels at the same calibrated travel.
    pub fn set_brake(&self, fraction: f32) {
        self.set_fraction(&self.brakes[0], fraction, &self.brake_adc);
        self.set_fraction(&self.brakes[1], fraction, &self.brake_adc);
    }

    /// Pull APPS1 to ground.
    pub fn disconnect_apps1(&self) {
        self.set_raw(self.apps[0].adc_channel, 0);
    }
}

impl AnalogInput for SimAdc {
    fn read(&self, channel: u8) -> u16 {
        self.channels
            .get(usize::from(channel))
            .map_or(0, |ch| ch.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_pedals_read_calibrated_rest() {
        let cfg = VcuConfig::default();
        let adc = SimAdc::new(&cfg);
        // APPS1 at rest: 0.3 V on a 1.8 V / 4096 scale.
        let raw = adc.read(cfg.apps.apps1.adc_channel);
        assert!((680..=684).contains(&raw), "{raw}");
        assert_eq!(adc.read(42), 0);
    }
}
