//! Battery management collaborator.
//!
//! BMS message decoding lives elsewhere; the supervisor only needs the
//! contactor status, current limits and the two contactor commands.

use vcu_common::vehicle::state::ContactorStatus;

pub trait Battery: Send + Sync {
    fn contactor_status(&self) -> ContactorStatus;
    /// Allowed charge current [A], ≥ 0.
    fn max_charge_current(&self) -> f32;
    /// Allowed discharge current [A], ≥ 0.
    fn max_discharge_current(&self) -> f32;
    fn pack_voltage(&self) -> f32;
    /// Measured pack current [A], positive when discharging.
    fn terminal_current(&self) -> f32;

    fn close_contactors(&self);
    fn open_contactors(&self);
}
