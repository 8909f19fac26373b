//! Torque request shaping: fraction → integer, clamping, fault gating.

use vcu_common::vehicle::config::RegenConfig;
use vcu_common::vehicle::plausibility::PlausibilityFlags;

/// Clamp into `[min, max]`. Idempotent.
#[inline]
pub fn clamp_torque(torque: i32, min: i16, max: i16) -> i16 {
    torque.clamp(i32::from(min), i32::from(max)) as i16
}

/// Scale a fraction in [-1, 1] onto the inverter torque range.
///
/// Positive fractions scale by `max`, negative by `|min|`. The fraction is
/// clamped before scaling; NaN maps to zero.
pub fn fraction_to_torque(fraction: f32, min: i16, max: i16) -> i16 {
    if fraction.is_nan() {
        return 0;
    }
    let f = fraction.clamp(-1.0, 1.0);
    let scaled = if f >= 0.0 {
        (f * f32::from(max)).round()
    } else {
        (-f * f32::from(min)).round()
    };
    clamp_torque(scaled as i32, min, max)
}

/// Regen needs the config switch, the driver switch, and charge headroom.
pub fn regen_permitted(cfg: &RegenConfig, switch_on: bool, max_charge_current: f32) -> bool {
    cfg.enabled && switch_on && max_charge_current > cfg.min_charge_current
}

/// Apply plausibility and regen permission to a clamped request.
///
/// Critical flags force zero, or regen-only (≤ 0) when regen is
/// independently permitted. Negative torque without permission is zeroed.
pub fn gate(torque: i16, flags: PlausibilityFlags, regen_ok: bool) -> i16 {
    if flags.has_critical() {
        return if regen_ok { torque.min(0) } else { 0 };
    }
    if torque < 0 && !regen_ok {
        return 0;
    }
    torque
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn half_pedal_is_half_max() {
        assert_eq!(fraction_to_torque(0.5, -100, 100), 50);
        assert_eq!(fraction_to_torque(0.499, -100, 100), 50);
        assert_eq!(fraction_to_torque(1.0, -100, 100), 100);
        assert_eq!(fraction_to_torque(0.0, -100, 100), 0);
    }

    #[test]
    fn regen_scales_by_min() {
        assert_eq!(fraction_to_torque(-0.3, -100, 100), -30);
        assert_eq!(fraction_to_torque(-2.0, -40, 100), -40);
    }

    #[test]
    fn bounds_are_exact() {
        assert_eq!(clamp_torque(100, -100, 100), 100);
        assert_eq!(clamp_torque(101, -100, 100), 100);
        assert_eq!(clamp_torque(-100, -100, 100), -100);
        assert_eq!(clamp_torque(-101, -100, 100), -100);
        assert_eq!(fraction_to_torque(f32::NAN, -100, 100), 0);
        assert_eq!(fraction_to_torque(f32::INFINITY, -100, 100), 100);
    }

    #[test]
    fn gate_rules() {
        let none = PlausibilityFlags::empty();
        let crit = PlausibilityFlags::APPS_DISAGREE;
        assert_eq!(gate(60, none, false), 60);
        assert_eq!(gate(-20, none, false), 0);
        assert_eq!(gate(-20, none, true), -20);
        assert_eq!(gate(60, crit, false), 0);
        assert_eq!(gate(60, crit, true), 0);
        assert_eq!(gate(-20, crit, true), -20);
        assert_eq!(gate(-20, crit, false), 0);
    }

    #[test]
    fn regen_permission_needs_all_three() {
        let mut cfg = RegenConfig::default();
        assert!(!regen_permitted(&cfg, true, 50.0));
        cfg.enabled = true;
        assert!(regen_permitted(&cfg, true, 50.0));
        assert!(!regen_permitted(&cfg, false, 50.0));
        assert!(!regen_permitted(&cfg, true, 0.5));
    }

    proptest! {
        #[test]
        fn clamp_is_idempotent(t in any::<i32>(), a in -1000i16..=0, b in 0i16..=1000) {
            let once = clamp_torque(t, a, b);
            prop_assert_eq!(clamp_torque(i32::from(once), a, b), once);
            prop_assert!(once >= a && once <= b);
        }

        #[test]
        fn scaled_torque_stays_in_range(f in -5.0f32..5.0, max in 1i16..=1000, min in -1000i16..=0) {
            let t = fraction_to_torque(f, min, max);
            prop_assert!(t >= min && t <= max);
        }
    }
}
