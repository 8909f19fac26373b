//! Pedal plausibility flags.
//!
//! Each flag is owned by one check in the plausibility monitor. Sensor and
//! disagreement flags clear themselves as soon as the fault goes away; the
//! hard-brake flag clears on its own release threshold. Any flag in
//! [`PlausibilityFlags::CRITICAL_MASK`] zeroes the drive torque.

use bitflags::bitflags;

bitflags! {
    /// Active plausibility faults.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PlausibilityFlags: u8 {
        /// An APPS channel is outside its voltage band.
        const APPS_DISCONNECTED  = 0x01;
        /// APPS1/APPS2 disagree beyond tolerance for longer than the timeout.
        const APPS_DISAGREE      = 0x02;
        /// A brake pressure channel is outside its voltage band.
        const BRAKE_DISCONNECTED = 0x04;
        /// Brake channels fail the ratio check for longer than the timeout.
        const BRAKE_DISAGREE     = 0x08;
        /// Brake applied with throttle above the trip limit.
        const HARD_BRAKE         = 0x10;
    }
}

impl PlausibilityFlags {
    /// Flags that force zero torque and suppress brake regen.
    pub const CRITICAL_MASK: Self = Self::from_bits_truncate(
        Self::APPS_DISCONNECTED.bits()
            | Self::APPS_DISAGREE.bits()
            | Self::BRAKE_DISCONNECTED.bits()
            | Self::BRAKE_DISAGREE.bits(),
    );

    /// Flags that describe the APPS pair being untrustworthy.
    pub const APPS_MASK: Self = Self::from_bits_truncate(
        Self::APPS_DISCONNECTED.bits() | Self::APPS_DISAGREE.bits(),
    );

    #[inline]
    pub const fn has_critical(&self) -> bool {
        self.intersects(Self::CRITICAL_MASK)
    }

    /// Critical or hard-brake: no positive torque this cycle.
    #[inline]
    pub const fn blocks_torque(&self) -> bool {
        self.has_critical() || self.contains(Self::HARD_BRAKE)
    }
}

impl Default for PlausibilityFlags {
    fn default() -> Self {
        Self::empty()
    }
}
