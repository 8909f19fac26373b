//! One analog pedal sensor: raw code → volts → calibrated fraction.

use vcu_common::consts::PEDAL_FILTER_WINDOW;
use vcu_common::vehicle::config::{AdcConfig, ChannelCalibration};

use super::filter::MovingAverage;

#[inline]
pub fn raw_to_volts(raw: u16, adc: &AdcConfig) -> f32 {
    f32::from(raw) * adc.full_scale_volts / f32::from(adc.resolution)
}

/// Calibrated travel, unclamped: 0 at `offset_volts`, 1 at
/// `offset_volts + range_volts`.
#[inline]
pub fn linear_fraction(volts: f32, cal: &ChannelCalibration) -> f32 {
    (volts - cal.offset_volts) / cal.range_volts
}

/// Trim `ignore` off both ends of travel and rescale into [0, 1].
#[inline]
pub fn saturate(fraction: f32, ignore: f32) -> f32 {
    let span = 1.0 - 2.0 * ignore;
    if span <= f32::EPSILON {
        return 0.0;
    }
    ((fraction - ignore) / span).clamp(0.0, 1.0)
}

#[derive(Debug, Clone)]
pub struct PedalChannel {
    cal: ChannelCalibration,
    adc: AdcConfig,
    ignore_fraction: f32,
    low_volts: f32,
    high_volts: f32,
    smoothing: bool,
    raw: u16,
    filter: MovingAverage<PEDAL_FILTER_WINDOW>,
}

impl PedalChannel {
    pub fn new(
        cal: ChannelCalibration,
        adc: AdcConfig,
        ignore_fraction: f32,
        band: (f32, f32),
        smoothing: bool,
    ) -> Self {
        Self {
            cal,
            adc,
            ignore_fraction,
            low_volts: band.0,
            high_volts: band.1,
            smoothing,
            raw: 0,
            filter: MovingAverage::new(),
        }
    }

    pub fn adc_channel(&self) -> u8 {
        self.cal.adc_channel
    }

    /// Store this tick's raw reading.
    pub fn sample(&mut self, raw: u16) {
        self.raw = raw;
        if self.smoothing {
            self.filter.push(raw);
        }
    }

    /// Refill the smoothing window from the latest live reading.
    pub fn restart_filter(&mut self) {
        self.filter.restart(self.raw);
    }

    #[inline]
    pub fn raw(&self) -> u16 {
        self.raw
    }

    /// Raw code after smoothing (or the raw code if smoothing is off).
    pub fn filtered_raw(&self) -> u16 {
        if self.smoothing && self.filter.is_seeded() {
            self.filter.average()
        } else {
            self.raw
        }
    }

    pub fn volts(&self) -> f32 {
        raw_to_volts(self.raw, &self.adc)
    }

    /// Calibrated, dead-banded fraction in [0, 1], after smoothing.
    pub fn fraction(&self) -> f32 {
        self.fraction_of(self.filtered_raw())
    }

    /// Same as [`Self::fraction`] but from this tick's raw reading only.
    /// Plausibility checks run on this so filter lag never delays a fault.
    pub fn instant_fraction(&self) -> f32 {
        self.fraction_of(self.raw)
    }

    fn fraction_of(&self, raw: u16) -> f32 {
        let volts = raw_to_volts(raw, &self.adc);
        saturate(linear_fraction(volts, &self.cal), self.ignore_fraction)
    }

    /// Instantaneous voltage strictly inside the connection band.
    pub fn is_connected(&self) -> bool {
        let v = self.volts();
        v > self.low_volts && v < self.high_volts
    }
}

/// Raw ADC code for `volts` (inverse of [`raw_to_volts`]).
pub fn volts_to_raw(volts: f32, adc: &AdcConfig) -> u16 {
    let code = (volts / adc.full_scale_volts * f32::from(adc.resolution)).round();
    code.clamp(0.0, f32::from(u16::MAX)) as u16
}

/// Raw code that puts a channel at calibrated travel `fraction`.
pub fn raw_for_fraction(fraction: f32, cal: &ChannelCalibration, adc: &AdcConfig) -> u16 {
    volts_to_raw(cal.offset_volts + fraction * cal.range_volts, adc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apps1() -> ChannelCalibration {
        ChannelCalibration {
            adc_channel: 0,
            offset_volts: 0.3,
            range_volts: 1.2,
        }
    }

    fn channel(smoothing: bool) -> PedalChannel {
        PedalChannel::new(apps1(), AdcConfig::default(), 0.2, (0.18, 1.62), smoothing)
    }

    #[test]
    fn volts_scale() {
        let adc = AdcConfig::default();
        assert!((raw_to_volts(4096, &adc) - 1.8).abs() < 1e-6);
        assert_eq!(raw_to_volts(0, &adc), 0.0);
        assert_eq!(volts_to_raw(0.9, &adc), 2048);
    }

    #[test]
    fn dead_band_both_ends() {
        assert_eq!(saturate(0.1, 0.2), 0.0);
        assert_eq!(saturate(0.2, 0.2), 0.0);
        assert!((saturate(0.5, 0.2) - 0.5).abs() < 1e-6);
        assert_eq!(saturate(0.8, 0.2), 1.0);
        assert_eq!(saturate(1.3, 0.2), 1.0);
        assert_eq!(saturate(-4.0, 0.2), 0.0);
    }

    #[test]
    fn degenerate_dead_band_is_zero() {
        assert_eq!(saturate(0.7, 0.5), 0.0);
    }

    #[test]
    fn inverted_sensor_reads_same_travel() {
        let cal = ChannelCalibration {
            adc_channel: 1,
            offset_volts: 1.5,
            range_volts: -1.2,
        };
        let adc = AdcConfig::default();
        let raw = raw_for_fraction(0.5, &cal, &adc);
        let f = linear_fraction(raw_to_volts(raw, &adc), &cal);
        assert!((f - 0.5).abs() < 1e-3);
    }

    #[test]
    fn midpoint_reads_half() {
        let mut ch = channel(false);
        ch.sample(raw_for_fraction(0.5, &apps1(), &AdcConfig::default()));
        assert!((ch.fraction() - 0.5).abs() < 2e-3);
        assert!(ch.is_connected());
    }

    #[test]
    fn connection_band_is_strict() {
        let adc = AdcConfig::default();
        let mut ch = channel(false);
        ch.sample(0);
        assert!(!ch.is_connected());
        ch.sample(volts_to_raw(1.7, &adc));
        assert!(!ch.is_connected());
        ch.sample(volts_to_raw(1.0, &adc));
        assert!(ch.is_connected());
    }

    #[test]
    fn smoothing_lags_step_but_connection_does_not() {
        let adc = AdcConfig::default();
        let mut ch = channel(true);
        ch.sample(volts_to_raw(1.0, &adc));
        ch.sample(0);
        // Window still mostly at 1.0 V.
        assert!(ch.filtered_raw() > volts_to_raw(0.8, &adc));
        assert!(!ch.is_connected());
        ch.restart_filter();
        assert_eq!(ch.filtered_raw(), 0);
    }

    #[test]
    fn instant_fraction_ignores_smoothing() {
        let adc = AdcConfig::default();
        let mut ch = channel(true);
        for _ in 0..PEDAL_FILTER_WINDOW {
            ch.sample(raw_for_fraction(0.8, &apps1(), &adc));
        }
        ch.sample(raw_for_fraction(0.5, &apps1(), &adc));
        assert!(ch.fraction() > 0.55);
        assert!((ch.instant_fraction() - 0.5).abs() < 2e-3);
    }
}
