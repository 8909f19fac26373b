//! Motor inverter control.
//!
//! [`InverterControl`] is the only surface the tractive-system supervisor
//! sees; [`InverterSupervisor`] implements it over a CANopen node.

pub mod feedback;
pub mod supervisor;

use vcu_common::vehicle::state::InverterState;

pub use feedback::InverterFeedback;
pub use supervisor::InverterSupervisor;

pub trait InverterControl: Send + Sync {
    /// Current state; lock-free.
    fn state(&self) -> InverterState;

    /// Request the boot sequence continue through to `Drive`.
    fn start(&self);

    /// Drop to pre-operational with the power stage disabled. Frames go out
    /// before anything waits on a lock.
    fn stop(&self);

    /// Transmit a torque setpoint whatever the current state.
    fn send_torque(&self, torque: i16);

    /// Latest decoded TPDO data.
    fn feedback(&self) -> InverterFeedback;
}
