//! Time-gated pedal checks.

use super::timer::PersistenceTimer;

// ─── Dual-Channel Agreement ─────────────────────────────────────────

/// Two fractions must stay within `tolerance` of each other.
///
/// Disagreement starts the timer; once it has lasted `timeout_ms` the fault
/// is raised. Fault and timer clear on the first agreeing sample.
#[derive(Debug, Clone)]
pub struct AgreementCheck {
    tolerance: f32,
    timer: PersistenceTimer,
}

impl AgreementCheck {
    pub const fn new(tolerance: f32, timeout_ms: u64) -> Self {
        Self {
            tolerance,
            timer: PersistenceTimer::new(timeout_ms),
        }
    }

    pub fn update(&mut self, a: f32, b: f32, now_ms: u64) -> bool {
        let disagree = (a - b).abs() > self.tolerance;
        self.timer.update(disagree, now_ms)
    }

    pub fn is_faulted(&self) -> bool {
        self.timer.is_tripped()
    }
}

// ─── Brake Ratio ────────────────────────────────────────────────────

/// Raw brake channel 1 must track `ratio × channel 2` within a band of
/// `band_counts` ADC codes.
#[derive(Debug, Clone)]
pub struct RatioCheck {
    ratio: f32,
    band_counts: f32,
    timer: PersistenceTimer,
}

impl RatioCheck {
    pub const fn new(ratio: f32, band_counts: f32, timeout_ms: u64) -> Self {
        Self {
            ratio,
            band_counts,
            timer: PersistenceTimer::new(timeout_ms),
        }
    }

    #[inline]
    pub fn in_band(&self, raw1: u16, raw2: u16) -> bool {
        let expected = self.ratio * f32::from(raw2);
        (f32::from(raw1) - expected).abs() <= self.band_counts
    }

    pub fn update(&mut self, raw1: u16, raw2: u16, now_ms: u64) -> bool {
        let bad = !self.in_band(raw1, raw2);
        self.timer.update(bad, now_ms)
    }

    pub fn is_faulted(&self) -> bool {
        self.timer.is_tripped()
    }
}

// ─── Hard Brake ─────────────────────────────────────────────────────

/// Brake applied with throttle above `trip` for `timeout_ms` latches the
/// fault. It releases only once throttle is at or below `release`,
/// whatever the brake does meanwhile.
#[derive(Debug, Clone)]
pub struct HardBrakeCheck {
    trip: f32,
    release: f32,
    timer: PersistenceTimer,
    latched: bool,
}

impl HardBrakeCheck {
    pub const fn new(trip: f32, release: f32, timeout_ms: u64) -> Self {
        Self {
            trip,
            release,
            timer: PersistenceTimer::new(timeout_ms),
            latched: false,
        }
    }

    pub fn update(&mut self, throttle: f32, brake_active: bool, now_ms: u64) -> bool {
        if self.latched {
            if throttle <= self.release {
                self.latched = false;
                self.timer.update(false, now_ms);
            }
            return self.latched;
        }
        if self.timer.update(brake_active && throttle > self.trip, now_ms) {
            self.latched = true;
        }
        self.latched
    }

    pub fn is_latched(&self) -> bool {
        self.latched
    }
}
