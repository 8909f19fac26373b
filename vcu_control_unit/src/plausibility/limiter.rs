//! Battery-power torque limiter.
//!
//! A PI loop on (allowed − measured) battery power trims a `P / ω` torque
//! ceiling. Below `min_speed_rpm` the ceiling is not applied, so a stalled
//! motor never divides by (near) zero. Shipped disabled with zero gains.

use std::f32::consts::PI;

use vcu_common::vehicle::config::PowerLimitConfig;

/// Inputs for one limiter step.
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerSample {
    pub pack_voltage: f32,
    pub terminal_current: f32,
    pub max_discharge_current: f32,
    pub speed_rpm: f32,
}

impl PowerSample {
    #[inline]
    pub fn allowed_power(&self) -> f32 {
        self.pack_voltage * self.max_discharge_current
    }

    #[inline]
    pub fn measured_power(&self) -> f32 {
        self.pack_voltage * self.terminal_current
    }
}

#[derive(Debug, Clone)]
pub struct PowerLimiter {
    cfg: PowerLimitConfig,
    integral: f32,
}

impl PowerLimiter {
    pub fn new(cfg: &PowerLimitConfig) -> Self {
        Self {
            cfg: cfg.clone(),
            integral: 0.0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.cfg.enabled
    }

    /// Cap a positive torque fraction. Negative (regen) requests and
    /// requests while disabled pass through untouched.
    pub fn limit(&mut self, fraction: f32, sample: &PowerSample, dt_s: f32) -> f32 {
        if !self.cfg.enabled || fraction <= 0.0 {
            return fraction;
        }

        let allowed = sample.allowed_power();
        let error = allowed - sample.measured_power();
        let bound = allowed.abs().max(1.0);
        self.integral = (self.integral + error * dt_s).clamp(-bound, bound);
        let budget = (allowed + self.cfg.kp * error + self.cfg.ki * self.integral).max(0.0);

        if sample.speed_rpm.abs() < self.cfg.min_speed_rpm {
            return fraction;
        }

        let omega = sample.speed_rpm.abs() * 2.0 * PI / 60.0;
        let ceiling = (budget / omega / self.cfg.max_motor_torque_nm).clamp(0.0, 1.0);
        fraction.min(ceiling)
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
    }
}
