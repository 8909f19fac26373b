//! Pedal plausibility: channels, filters, checks, the monitor that owns
//! them, and the power limiter applied on top of the checked request.

pub mod channel;
pub mod checks;
pub mod filter;
pub mod limiter;
pub mod monitor;
pub mod timer;

pub use limiter::{PowerLimiter, PowerSample};
pub use monitor::PlausibilityMonitor;
