//! CAN bus plumbing: frame type, transport capability, backends.

pub mod frame;
pub mod loopback;
#[cfg(feature = "socketcan")]
pub mod socketcan;
pub mod transport;

pub use frame::CanFrame;
pub use loopback::Loopback;
pub use transport::{CanBus, CanInterface, CanTransport, SubscriberMap, TransportError};
